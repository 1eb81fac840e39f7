//! The backend turns the IR into text assembly for a stack machine. Every
//! IR operand is pushed on the operand stack right before the instruction
//! that consumes it, so the only state carried between instructions lives
//! in local variable slots.
//!
//! The depth of the operand stack is tracked while emitting, which gives
//! the `.limit stack` of each method without a separate pass.

pub mod assemblers;
pub mod targets;
