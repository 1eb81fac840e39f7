//! Names and types are resolved here and the checked AST is optimized before
//! being lowered and flattened to IR. Register allocation rewrites the slots
//! of the IR in place right before it is handed to the backend.

use crate::{diagnostics::Diagnostic, frontend::ast::Ast};

pub mod ir;
pub mod optimization;
pub mod register_allocation;
pub mod resolve;
pub mod symbol_table;
pub mod ty;
pub mod type_check;

use self::{resolve::SymbolTableBuilder, symbol_table::SymbolTable, type_check::TypeChecker};

/// Builds the symbol table and type checks every method body. Symbol errors
/// stop analysis before type checking, and any error at all stops the
/// pipeline.
pub fn analyze(ast: &mut Ast) -> Result<SymbolTable, Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();

    let table = SymbolTableBuilder::build(ast, &mut diagnostics);

    if diagnostics.is_empty() {
        TypeChecker::check(ast, &table, &mut diagnostics);
    }

    if diagnostics.is_empty() {
        Ok(table)
    } else {
        Err(diagnostics)
    }
}
