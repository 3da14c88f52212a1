//! Bytecode compilation errors.
//!
//! Compilation stops at the first error and no bytecode is produced.

use thiserror::Error;

use crate::ast::{InfixOp, PrefixOp};
use crate::vm::EncodeError;

/// Errors that can occur during bytecode compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Statement kind the compiler has no translation for.
    #[error("unsupported statement: {kind}")]
    UnsupportedStatement { kind: &'static str },

    /// Expression kind the compiler has no translation for.
    #[error("unsupported expression: {kind}")]
    UnsupportedExpression { kind: &'static str },

    #[error("unknown operator: {0}")]
    UnknownInfixOperator(InfixOp),

    #[error("unknown operator: {0}")]
    UnknownPrefixOperator(PrefixOp),

    /// Constant pool outgrew the 2-byte index operand.
    #[error("too many constants (limit: {limit})")]
    TooManyConstants { limit: usize },

    /// Jump target outgrew the 2-byte address operand.
    #[error("jump target {target} out of range (limit: {limit})")]
    JumpTooFar { target: usize, limit: usize },

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
