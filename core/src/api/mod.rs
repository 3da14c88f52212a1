//! Host-facing configuration.
//!
//! # Example
//!
//! ```ignore
//! use monk_core::{api::ExecutionOptions, compile, vm::Vm};
//!
//! let bytecode = compile(&program)?;
//! let mut vm = Vm::with_options(&bytecode, &ExecutionOptions { stack_size: 64 });
//! vm.run()?;
//! println!("{}", vm.last_popped_value());
//! ```

mod options;

pub use options::{DEFAULT_STACK_SIZE, ExecutionOptions};
