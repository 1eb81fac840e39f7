use crate::{diagnostics::GenerationError, middle::ir};

mod jasmin;

pub trait CodeGenerator {
    fn translate_to_asm(&self, class: &ir::Class) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// Text assembly for the Jasmin assembler
    #[default]
    Jasmin,
}

impl Target {
    pub fn get_code_generator(self) -> impl CodeGenerator {
        match self {
            Target::Jasmin => jasmin::CodeGeneratorJasmin,
        }
    }
}
