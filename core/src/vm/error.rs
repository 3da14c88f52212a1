//! Runtime errors.
//!
//! Every error aborts `Vm::run` on the spot. The stack is left partially
//! evaluated and must not be inspected afterwards.

use thiserror::Error;

use super::instruction_set::{InvalidOpcode, Opcode};
use crate::values::ValueType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// A push found every stack slot in use.
    #[error("stack overflow: capacity of {capacity} values exceeded")]
    StackOverflow { capacity: usize },

    /// A pop found no live value. Only malformed streams get here.
    #[error("stack underflow")]
    StackUnderflow,

    /// Arithmetic on something other than two integers.
    #[error("unsupported types for binary operation: {left}, {right}")]
    UnsupportedBinaryTypes { left: ValueType, right: ValueType },

    /// `-` applied to something other than an integer.
    #[error("unsupported type for negation: {operand}")]
    UnsupportedNegation { operand: ValueType },

    /// Comparison with no meaning for the operand types.
    #[error("unknown operator: {op} ({left} {right})")]
    UnknownOperator {
        op: Opcode,
        left: ValueType,
        right: ValueType,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {op}")]
    IntegerOverflow { op: Opcode },

    #[error("{source} at offset {ip}")]
    InvalidOpcode { source: InvalidOpcode, ip: usize },

    /// An operand runs past the end of the instruction stream.
    #[error("truncated {op} instruction at offset {ip}")]
    TruncatedInstruction { op: Opcode, ip: usize },

    #[error("constant index {index} out of range (pool has {len} entries)")]
    ConstantOutOfRange { index: usize, len: usize },
}
