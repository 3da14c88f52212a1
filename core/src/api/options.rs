//! Configuration options for execution.

/// Number of operand stack slots a VM gets unless told otherwise.
pub const DEFAULT_STACK_SIZE: usize = 2048;

/// Configuration options for bytecode execution.
///
/// These options control resource limits of a single VM run.
///
/// # Example
///
/// ```
/// use monk_core::api::ExecutionOptions;
///
/// let options = ExecutionOptions { stack_size: 16 };
/// assert_eq!(ExecutionOptions::default().stack_size, 2048);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Capacity of the operand stack. Pushing past it is a stack overflow.
    ///
    /// Default: 2048
    pub stack_size: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}
