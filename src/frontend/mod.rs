//! The frontend receives the tree produced by the external parser and turns
//! it into the typed arena [`ast::Ast`] the rest of the compiler works on.

use std::path::PathBuf;

use crate::{diagnostics::Diagnostic, frontend::ast::Ast};

pub mod ast;
pub mod interchange;

/// A parser hand-off document, kept around to name it in diagnostics
#[derive(Debug)]
pub struct SourceFile {
    pub contents: String,
    pub origin: SourceFileOrigin,
}

impl SourceFile {
    pub fn from_memory(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            origin: SourceFileOrigin::Memory,
        }
    }

    pub fn read(path: PathBuf) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(&path)?;

        Ok(Self {
            contents,
            origin: SourceFileOrigin::File(path),
        })
    }

    pub fn parse(&self) -> Result<Ast, Vec<Diagnostic>> {
        interchange::parse_tree(&self.contents)
    }
}

#[derive(Debug)]
pub enum SourceFileOrigin {
    Memory,
    File(PathBuf),
}

impl core::fmt::Display for SourceFileOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFileOrigin::Memory => f.write_str("<memory>"),
            SourceFileOrigin::File(path) => f.write_fmt(format_args!("{}", path.display())),
        }
    }
}
