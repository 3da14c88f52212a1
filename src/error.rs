//! Error type of the `monk` front door.
//!
//! Each stage of the pipeline keeps its own precise error in `monk_core`;
//! this wraps them for hosts that just want to report what went wrong.

use miette::Diagnostic;
use thiserror::Error;

use monk_core::{BytecodeError, CompileError, RuntimeError};

/// Any failure while turning a program into a value.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum Error {
    /// The program uses something the compiler cannot lower.
    #[error("compilation failed: {0}")]
    #[diagnostic(
        code(monk::compile),
        help("programs may only use integer and boolean literals, operators and if/else")
    )]
    Compile(#[from] CompileError),

    /// Execution aborted.
    #[error("runtime error: {0}")]
    #[diagnostic(code(monk::runtime))]
    Runtime(#[from] RuntimeError),

    /// Serialized or hand-built bytecode is malformed.
    #[error("invalid bytecode: {0}")]
    #[diagnostic(code(monk::bytecode))]
    Bytecode(#[from] BytecodeError),
}

impl Error {
    /// True for failures caused by the machine's resource limits rather
    /// than by the program itself.
    pub fn is_resource_exceeded(&self) -> bool {
        matches!(self, Error::Runtime(RuntimeError::StackOverflow { .. }))
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
