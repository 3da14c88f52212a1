//! Monk - a tiny bytecode compiler and stack virtual machine
//!
//! # Overview
//!
//! Monk lowers a syntax tree of integer and boolean expressions,
//! prefix and infix operators and `if`/`else` conditionals into a flat
//! bytecode stream, then runs it on a stack machine.
//!
//! # Quick Start
//!
//! ```
//! use bumpalo::Bump;
//! use monk::{Value, ast::{AstBuilder, InfixOp}};
//!
//! let arena = Bump::new();
//! let ast = AstBuilder::new(&arena);
//!
//! // if (1 < 2) { 10 } else { 20 }
//! let program = ast.program(&[ast.expr_stmt(ast.if_expr(
//!     ast.infix(InfixOp::Lt, ast.int(1), ast.int(2)),
//!     ast.block(&[ast.expr_stmt(ast.int(10))]),
//!     Some(ast.block(&[ast.expr_stmt(ast.int(20))])),
//! ))]);
//!
//! assert_eq!(monk::run(&program).unwrap(), Value::Integer(10));
//! ```
//!
//! # Stages
//!
//! 1. [`compile`] turns a [`ast::Program`] into [`Bytecode`].
//! 2. [`Vm`] executes bytecode; the result is the last value popped.
//!
//! Bytecode can be stored and reloaded with [`Bytecode::to_bytes`] and
//! [`Bytecode::from_bytes`], and printed as a disassembly listing through
//! the `Display` impl of [`Instructions`].

mod error;

pub use error::{Error, Result};

// Re-export public API from monk_core
pub use monk_core::api::{DEFAULT_STACK_SIZE, ExecutionOptions};
pub use monk_core::compiler::{CompileError, Compiler, compile};
pub use monk_core::values::{Value, ValueType};
pub use monk_core::vm::{Bytecode, BytecodeError, Instructions, Opcode, RuntimeError, Vm, make};
pub use monk_core::{ast, values, vm};

/// Compiles and runs `program` with default options.
pub fn run(program: &ast::Program<'_>) -> Result<Value> {
    run_with_options(program, &ExecutionOptions::default())
}

/// Compiles and runs `program`, returning the last value it popped.
pub fn run_with_options(program: &ast::Program<'_>, options: &ExecutionOptions) -> Result<Value> {
    let bytecode = compile(program)?;
    let value = Vm::execute(&bytecode, options)?;
    tracing::debug!(%value, "Program finished");
    Ok(value)
}

/// Loads serialized bytecode and runs it.
pub fn run_bytes(bytes: &[u8], options: &ExecutionOptions) -> Result<Value> {
    let bytecode = Bytecode::from_bytes(bytes)?;
    Ok(Vm::execute(&bytecode, options)?)
}
