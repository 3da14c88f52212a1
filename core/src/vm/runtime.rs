use super::instruction_set::{Opcode, read_u16};

use crate::{
    api::ExecutionOptions,
    values::{Value, ValueType},
    vm::{Bytecode, RuntimeError, Stack},
};

/// Stack-based interpreter for compiled [`Bytecode`].
///
/// A VM is single-use: create it, call [`Vm::run`] once, read
/// [`Vm::last_popped_value`], drop it.
pub struct Vm<'b> {
    instructions: &'b [u8],
    constants: &'b [Value],
    stack: Stack<Value>,
    ip: usize,
}

impl<'b> Vm<'b> {
    pub fn new(bytecode: &'b Bytecode) -> Self {
        Self::with_options(bytecode, &ExecutionOptions::default())
    }

    pub fn with_options(bytecode: &'b Bytecode, options: &ExecutionOptions) -> Self {
        Vm {
            instructions: bytecode.instructions().as_bytes(),
            constants: bytecode.constants(),
            stack: Stack::new(options.stack_size, Value::NULL),
            ip: 0,
        }
    }

    /// Runs `bytecode` on a fresh VM and returns the last popped value.
    pub fn execute(
        bytecode: &'b Bytecode,
        options: &ExecutionOptions,
    ) -> Result<Value, RuntimeError> {
        let mut vm = Vm::with_options(bytecode, options);
        vm.run()?;
        Ok(vm.last_popped_value())
    }

    /// Executes instructions until the instruction pointer runs off the end
    /// of the stream, or until the first error.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let result = self.run_main_loop();
        if let Err(err) = &result {
            tracing::debug!(error = %err, ip = self.ip, sp = self.stack.len(), "Execution aborted");
        }
        result
    }

    /// The value a fully executed program evaluated to.
    ///
    /// This is the slot right above the top of the stack, so it is only
    /// meaningful after `run` returned `Ok` and something was popped.
    pub fn last_popped_value(&self) -> Value {
        self.stack.last_popped().unwrap_or(Value::NULL)
    }

    /// Current top of the stack, if any.
    pub fn stack_top(&self) -> Option<Value> {
        self.stack.top()
    }

    fn run_main_loop(&mut self) -> Result<(), RuntimeError> {
        while self.ip < self.instructions.len() {
            let ip = self.ip;
            let op = Opcode::try_from(self.instructions[ip])
                .map_err(|source| RuntimeError::InvalidOpcode { source, ip })?;
            self.ip += 1;

            tracing::trace!(ip, %op, sp = self.stack.len(), "dispatch");

            use Opcode::*;
            match op {
                Constant => {
                    let index = self.read_operand(op, ip)? as usize;
                    let value = *self.constants.get(index).ok_or(
                        RuntimeError::ConstantOutOfRange {
                            index,
                            len: self.constants.len(),
                        },
                    )?;
                    self.stack.push(value)?;
                }
                Add | Sub | Mul | Div => self.execute_binary_operation(op)?,
                True => self.stack.push(Value::TRUE)?,
                False => self.stack.push(Value::FALSE)?,
                Null => self.stack.push(Value::NULL)?,
                Equal | NotEqual | GreaterThan => self.execute_comparison(op)?,
                Minus => self.execute_minus_operator()?,
                Bang => self.execute_bang_operator()?,
                Jump => {
                    let target = self.read_operand(op, ip)?;
                    self.ip = target as usize;
                }
                JumpNotTruthy => {
                    let target = self.read_operand(op, ip)?;
                    let condition = self.stack.pop()?;
                    if !is_truthy(condition) {
                        self.ip = target as usize;
                    }
                }
                Pop => {
                    self.stack.pop()?;
                }
            }
        }
        Ok(())
    }

    /// Reads the `u16` operand at `self.ip` and steps past it.
    #[inline]
    fn read_operand(&mut self, op: Opcode, ip: usize) -> Result<u16, RuntimeError> {
        let bytes = self
            .instructions
            .get(self.ip..self.ip + 2)
            .ok_or(RuntimeError::TruncatedInstruction { op, ip })?;
        self.ip += 2;
        Ok(read_u16(bytes))
    }

    fn execute_binary_operation(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        match (left, right) {
            (Value::Integer(left), Value::Integer(right)) => {
                let result = execute_integer_arithmetic(op, left, right)?;
                self.stack.push(Value::Integer(result))
            }
            _ => Err(RuntimeError::UnsupportedBinaryTypes {
                left: left.value_type(),
                right: right.value_type(),
            }),
        }
    }

    fn execute_comparison(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        let result = match (left, right) {
            (Value::Integer(left), Value::Integer(right)) => {
                execute_integer_comparison(op, left, right)?
            }
            // Integers only ever compare numerically, never through the
            // singleton path below.
            (Value::Integer(_), _) | (_, Value::Integer(_)) => {
                return Err(unknown_operator(op, left, right));
            }
            // Booleans and null are singletons: same variant, same value.
            _ => match op {
                Opcode::Equal => left == right,
                Opcode::NotEqual => left != right,
                _ => return Err(unknown_operator(op, left, right)),
            },
        };
        self.stack.push(Value::from_bool(result))
    }

    fn execute_minus_operator(&mut self) -> Result<(), RuntimeError> {
        let operand = self.stack.pop()?;
        let Value::Integer(value) = operand else {
            return Err(RuntimeError::UnsupportedNegation {
                operand: operand.value_type(),
            });
        };
        let negated = value
            .checked_neg()
            .ok_or(RuntimeError::IntegerOverflow { op: Opcode::Minus })?;
        self.stack.push(Value::Integer(negated))
    }

    /// `!true` is false, `!false` is true, and `!` of anything else
    /// (null and every integer included) is false.
    fn execute_bang_operator(&mut self) -> Result<(), RuntimeError> {
        let result = match self.stack.pop()? {
            Value::Boolean(true) => Value::FALSE,
            Value::Boolean(false) => Value::TRUE,
            _ => Value::FALSE,
        };
        self.stack.push(result)
    }
}

/// Condition check for `JumpNotTruthy`: only `false` is falsy. Null and zero
/// are truthy.
#[inline]
fn is_truthy(value: Value) -> bool {
    !matches!(value, Value::Boolean(false))
}

fn execute_integer_arithmetic(op: Opcode, left: i64, right: i64) -> Result<i64, RuntimeError> {
    let result = match op {
        Opcode::Add => left.checked_add(right),
        Opcode::Sub => left.checked_sub(right),
        Opcode::Mul => left.checked_mul(right),
        Opcode::Div => {
            if right == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            left.checked_div(right)
        }
        _ => {
            return Err(RuntimeError::UnknownOperator {
                op,
                left: ValueType::Integer,
                right: ValueType::Integer,
            });
        }
    };
    result.ok_or(RuntimeError::IntegerOverflow { op })
}

fn execute_integer_comparison(op: Opcode, left: i64, right: i64) -> Result<bool, RuntimeError> {
    match op {
        Opcode::GreaterThan => Ok(left > right),
        Opcode::Equal => Ok(left == right),
        Opcode::NotEqual => Ok(left != right),
        _ => Err(RuntimeError::UnknownOperator {
            op,
            left: ValueType::Integer,
            right: ValueType::Integer,
        }),
    }
}

fn unknown_operator(op: Opcode, left: Value, right: Value) -> RuntimeError {
    RuntimeError::UnknownOperator {
        op,
        left: left.value_type(),
        right: right.value_type(),
    }
}
