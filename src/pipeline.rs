//! Runs the stages in order. Each stage consumes the output of the previous
//! one, and the first stage that reports diagnostics ends the compilation.

use crate::{
    backend::targets::{CodeGenerator, Target},
    config::CompilerConfig,
    diagnostics::Diagnostic,
    frontend::ast::Ast,
    middle::{self, ir, ir::ast_lowering::lower_to_ir, optimization, register_allocation},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub ir: ir::Class,
    pub assembly: String,
}

pub fn compile(ast: &mut Ast, config: &CompilerConfig) -> Result<Compilation, Vec<Diagnostic>> {
    let table = {
        let _span = tracing::info_span!("analysis").entered();
        middle::analyze(ast)?
    };

    if config.optimize {
        let _span = tracing::info_span!("optimization").entered();
        let rounds = optimization::optimize(ast, &table);
        tracing::debug!(rounds, "tree optimized");
    }

    let mut class = {
        let _span = tracing::info_span!("lowering").entered();
        lower_to_ir(ast, &table)
    };

    if let Some(budget) = config.register_allocation {
        let _span = tracing::info_span!("register_allocation").entered();
        register_allocation::allocate_registers(&mut class, budget)?;
    }

    if config.debug {
        tracing::info!("intermediate representation:\n{class}");
    }

    let assembly = {
        let _span = tracing::info_span!("generation").entered();
        Target::Jasmin
            .get_code_generator()
            .translate_to_asm(&class)
            .map_err(|error| vec![Diagnostic::unpositioned(error)])?
    };

    Ok(Compilation {
        ir: class,
        assembly,
    })
}
