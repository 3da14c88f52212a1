//! Bytecode compiler implementation.

use crate::{
    Vec,
    ast::{Block, Expr, InfixOp, PrefixOp, Program, Statement},
    compiler::CompileError,
    values::Value,
    vm::{Bytecode, Instructions, Opcode, make},
};

/// Operand written into forward jumps until their target is known.
const PLACEHOLDER: usize = 9999;

/// Largest value a 2-byte operand can carry.
const MAX_OPERAND: usize = u16::MAX as usize;

/// Opcode and offset of an instruction already in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EmittedInstruction {
    op: Opcode,
    position: usize,
}

/// Compiles a whole program in one call.
pub fn compile(program: &Program<'_>) -> Result<Bytecode, CompileError> {
    let mut compiler = Compiler::new();
    compiler.compile_program(program)?;
    let bytecode = compiler.bytecode();
    tracing::debug!(
        bytes = bytecode.instructions().len(),
        constants = bytecode.constants().len(),
        "Compiled program"
    );
    Ok(bytecode)
}

/// Bytecode compiler that turns a syntax tree into an instruction stream.
///
/// The compiler walks the tree once, in program order. Literals go to the
/// constant pool (one slot per occurrence, no deduplication); everything else
/// becomes instructions.
#[derive(Default)]
pub struct Compiler {
    instructions: Instructions,

    /// Constant pool. Indices are handed out in insertion order and never reused.
    constants: Vec<Value>,

    /// Most recently emitted instruction.
    last_instruction: Option<EmittedInstruction>,

    /// The one emitted before `last_instruction`, so that removing the last
    /// instruction leaves the bookkeeping correct.
    previous_instruction: Option<EmittedInstruction>,
}

impl Compiler {
    /// Create a new bytecode compiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles every statement of `program`, appending to what was compiled so far.
    pub fn compile_program(&mut self, program: &Program<'_>) -> Result<(), CompileError> {
        for statement in program.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// Finalize compilation and return the bytecode.
    pub fn bytecode(self) -> Bytecode {
        Bytecode::new(self.instructions, self.constants)
    }

    fn compile_statement(&mut self, statement: &Statement<'_>) -> Result<(), CompileError> {
        match statement {
            Statement::Expression(expr) => {
                self.compile_expression(expr)?;
                // Statements never leave values behind.
                self.emit(Opcode::Pop, &[])?;
            }
            Statement::Block(block) => self.compile_block(block)?,
            Statement::Let { .. } | Statement::Return(_) => {
                return Err(CompileError::UnsupportedStatement {
                    kind: statement.kind(),
                });
            }
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &Block<'_>) -> Result<(), CompileError> {
        for statement in block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_expression(&mut self, expr: &Expr<'_>) -> Result<(), CompileError> {
        match expr {
            Expr::Integer(value) => {
                let index = self.add_constant(Value::Integer(*value))?;
                self.emit(Opcode::Constant, &[index])?;
            }
            Expr::Boolean(true) => {
                self.emit(Opcode::True, &[])?;
            }
            Expr::Boolean(false) => {
                self.emit(Opcode::False, &[])?;
            }
            Expr::Prefix { op, operand } => {
                self.compile_expression(operand)?;
                let opcode = match op {
                    PrefixOp::Neg => Opcode::Minus,
                    PrefixOp::Not => Opcode::Bang,
                    PrefixOp::Plus => return Err(CompileError::UnknownPrefixOperator(*op)),
                };
                self.emit(opcode, &[])?;
            }
            Expr::Infix {
                op: InfixOp::Lt,
                left,
                right,
            } => {
                // `a < b` is `b > a`: swap compile order, not results.
                self.compile_expression(right)?;
                self.compile_expression(left)?;
                self.emit(Opcode::GreaterThan, &[])?;
            }
            Expr::Infix { op, left, right } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                let opcode = match op {
                    InfixOp::Add => Opcode::Add,
                    InfixOp::Sub => Opcode::Sub,
                    InfixOp::Mul => Opcode::Mul,
                    InfixOp::Div => Opcode::Div,
                    InfixOp::Gt => Opcode::GreaterThan,
                    InfixOp::Eq => Opcode::Equal,
                    InfixOp::NotEq => Opcode::NotEqual,
                    InfixOp::Lt | InfixOp::Mod | InfixOp::LtEq | InfixOp::GtEq => {
                        return Err(CompileError::UnknownInfixOperator(*op));
                    }
                };
                self.emit(opcode, &[])?;
            }
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;

                // Target unknown until the consequence is emitted.
                let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER])?;

                self.compile_branch(consequence)?;

                // Skips the alternative once the consequence ran.
                let jump = self.emit(Opcode::Jump, &[PLACEHOLDER])?;

                let after_consequence = self.instructions.len();
                self.change_operand(jump_not_truthy, after_consequence)?;

                match alternative {
                    Some(alternative) => self.compile_branch(alternative)?,
                    None => {
                        self.emit(Opcode::Null, &[])?;
                    }
                }

                let after_alternative = self.instructions.len();
                self.change_operand(jump, after_alternative)?;
            }
            Expr::Str(_) | Expr::Ident(_) => {
                return Err(CompileError::UnsupportedExpression { kind: expr.kind() });
            }
        }
        Ok(())
    }

    /// Compiles one arm of a conditional so that it leaves exactly one value
    /// on the stack: the trailing `Pop` of its last expression statement is
    /// taken back, and an arm that produces nothing yields null.
    fn compile_branch(&mut self, block: &Block<'_>) -> Result<(), CompileError> {
        self.compile_block(block)?;
        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last_pop();
        } else {
            self.emit(Opcode::Null, &[])?;
        }
        Ok(())
    }

    // === Instruction Emission ===

    /// Encodes and appends an instruction, returning where it landed.
    fn emit(&mut self, op: Opcode, operands: &[usize]) -> Result<EmittedInstruction, CompileError> {
        let instruction = make(op, operands)?;
        let position = self.instructions.push_instruction(&instruction);
        tracing::trace!(position, %op, ?operands, "emit");

        let emitted = EmittedInstruction { op, position };
        self.previous_instruction = self.last_instruction.replace(emitted);
        Ok(emitted)
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        self.last_instruction.is_some_and(|last| last.op == op)
    }

    fn remove_last_pop(&mut self) {
        if let Some(last) = self.last_instruction {
            debug_assert_eq!(last.op, Opcode::Pop);
            self.instructions.truncate(last.position);
            self.last_instruction = self.previous_instruction.take();
        }
    }

    // === Constant Pool Management ===

    /// Appends a constant to the pool and returns its index.
    fn add_constant(&mut self, value: Value) -> Result<usize, CompileError> {
        let index = self.constants.len();
        if index > MAX_OPERAND {
            return Err(CompileError::TooManyConstants {
                limit: MAX_OPERAND + 1,
            });
        }
        self.constants.push(value);
        Ok(index)
    }

    // === Jump Patching ===

    /// Rewrites the operand of an already emitted jump to `target`.
    ///
    /// The instruction is re-encoded and written over its old bytes; its
    /// width does not change, so no other instruction moves.
    fn change_operand(
        &mut self,
        instruction: EmittedInstruction,
        target: usize,
    ) -> Result<(), CompileError> {
        if target > MAX_OPERAND {
            return Err(CompileError::JumpTooFar {
                target,
                limit: MAX_OPERAND,
            });
        }
        let patched = make(instruction.op, &[target])?;
        self.instructions.overwrite(instruction.position, &patched);
        Ok(())
    }
}
