//! Bytecode compiler for Monk programs.
//!
//! This module transforms a syntax tree into a flat instruction stream plus a
//! constant pool.
//!
//! ## Design
//!
//! - Single linear pass over the tree, in program order
//! - Forward jumps are emitted with a placeholder operand and backpatched in
//!   place once the target is known; addresses are absolute, so nothing ever
//!   shifts
//! - The compiler remembers the last two emitted instructions so a trailing
//!   `Pop` can be taken back when a block is used as a value

mod bytecode;
mod error;


pub use bytecode::{Compiler, compile};
pub use error::CompileError;
