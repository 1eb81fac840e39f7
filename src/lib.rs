//! Back end of a compiler for Java--, a small object oriented subset of
//! Java. The input is the syntax tree produced by an external parser, the
//! output is Jasmin assembly for the Java virtual machine.

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod frontend;
pub mod index;
pub mod middle;
pub mod pipeline;

#[cfg(test)]
mod test_helpers;
