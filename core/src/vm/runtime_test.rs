//! Tests for the virtual machine.

use bumpalo::Bump;
use pretty_assertions::assert_eq;

use crate::{
    Vec,
    api::ExecutionOptions,
    ast::{AstBuilder, Expr, InfixOp, PrefixOp, Program, Statement},
    compile,
    values::{Value, ValueType},
    vec,
    vm::{Bytecode, Instructions, InvalidOpcode, Opcode, RuntimeError, Vm, make},
};

fn program<'a>(ast: &AstBuilder<'a>, exprs: &[&'a Expr<'a>]) -> Program<'a> {
    let statements: Vec<Statement<'a>> = exprs.iter().map(|&expr| ast.expr_stmt(expr)).collect();
    ast.program(&statements)
}

/// Compiles `exprs` as expression statements and runs them on a fresh VM.
fn run<'a>(ast: &AstBuilder<'a>, exprs: &[&'a Expr<'a>]) -> Result<Value, RuntimeError> {
    let bytecode = compile(&program(ast, exprs)).unwrap();
    Vm::execute(&bytecode, &ExecutionOptions::default())
}

#[track_caller]
fn assert_evaluates_to<'a>(ast: &AstBuilder<'a>, expr: &'a Expr<'a>, expected: Value) {
    assert_eq!(run(ast, &[expr]), Ok(expected));
}

fn not<'a>(ast: &AstBuilder<'a>, expr: &'a Expr<'a>) -> &'a Expr<'a> {
    ast.prefix(PrefixOp::Not, expr)
}

fn raw_bytecode(parts: &[(Opcode, &[usize])], constants: Vec<Value>) -> Bytecode {
    let instructions = parts
        .iter()
        .map(|(op, operands)| make(*op, operands).unwrap())
        .collect();
    Bytecode::new(instructions, constants)
}

// === Integer Arithmetic ===

#[test]
fn test_integer_arithmetic() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);
    let int = |v| Value::Integer(v);

    assert_evaluates_to(&a, a.int(1), int(1));
    assert_evaluates_to(&a, a.infix(InfixOp::Add, a.int(1), a.int(2)), int(3));
    assert_evaluates_to(&a, a.infix(InfixOp::Sub, a.int(1), a.int(2)), int(-1));
    assert_evaluates_to(&a, a.infix(InfixOp::Mul, a.int(2), a.int(4)), int(8));
    assert_evaluates_to(&a, a.infix(InfixOp::Div, a.int(4), a.int(2)), int(2));

    // 50 / 2 * 2 + 10 - 5
    let expr = a.infix(
        InfixOp::Sub,
        a.infix(
            InfixOp::Add,
            a.infix(
                InfixOp::Mul,
                a.infix(InfixOp::Div, a.int(50), a.int(2)),
                a.int(2),
            ),
            a.int(10),
        ),
        a.int(5),
    );
    assert_evaluates_to(&a, expr, int(55));

    // 5 * (2 + 10)
    let expr = a.infix(InfixOp::Mul, a.int(5), a.infix(InfixOp::Add, a.int(2), a.int(10)));
    assert_evaluates_to(&a, expr, int(60));

    // -50 + 100 + -50
    let expr = a.infix(
        InfixOp::Add,
        a.infix(InfixOp::Add, a.prefix(PrefixOp::Neg, a.int(50)), a.int(100)),
        a.prefix(PrefixOp::Neg, a.int(50)),
    );
    assert_evaluates_to(&a, expr, int(0));
}

#[test]
fn test_division_truncates_toward_zero() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    let expr = a.infix(InfixOp::Div, a.int(7), a.prefix(PrefixOp::Neg, a.int(2)));
    assert_evaluates_to(&a, expr, Value::Integer(-3));

    let expr = a.infix(InfixOp::Div, a.prefix(PrefixOp::Neg, a.int(7)), a.int(2));
    assert_evaluates_to(&a, expr, Value::Integer(-3));
}

#[test]
fn test_last_popped_value_is_last_statement() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    // 1; 2; 3
    assert_eq!(run(&a, &[a.int(1), a.int(2), a.int(3)]), Ok(Value::Integer(3)));
}

// === Booleans & Comparisons ===

#[test]
fn test_boolean_expressions() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);
    let t = Value::TRUE;
    let f = Value::FALSE;

    assert_evaluates_to(&a, a.boolean(true), t);
    assert_evaluates_to(&a, a.boolean(false), f);

    let cases = [
        (InfixOp::Lt, 1, 2, t),
        (InfixOp::Gt, 1, 2, f),
        (InfixOp::Lt, 1, 1, f),
        (InfixOp::Gt, 1, 1, f),
        (InfixOp::Eq, 1, 1, t),
        (InfixOp::NotEq, 1, 1, f),
        (InfixOp::Eq, 1, 2, f),
        (InfixOp::NotEq, 1, 2, t),
    ];
    for (op, left, right, expected) in cases {
        assert_evaluates_to(&a, a.infix(op, a.int(left), a.int(right)), expected);
    }

    let cases = [
        (InfixOp::Eq, true, true, t),
        (InfixOp::Eq, false, false, t),
        (InfixOp::Eq, true, false, f),
        (InfixOp::NotEq, true, false, t),
        (InfixOp::NotEq, false, true, t),
    ];
    for (op, left, right, expected) in cases {
        assert_evaluates_to(&a, a.infix(op, a.boolean(left), a.boolean(right)), expected);
    }

    // (1 < 2) == true
    let expr = a.infix(
        InfixOp::Eq,
        a.infix(InfixOp::Lt, a.int(1), a.int(2)),
        a.boolean(true),
    );
    assert_evaluates_to(&a, expr, t);

    // (1 > 2) == true
    let expr = a.infix(
        InfixOp::Eq,
        a.infix(InfixOp::Gt, a.int(1), a.int(2)),
        a.boolean(true),
    );
    assert_evaluates_to(&a, expr, f);
}

#[test]
fn test_bang_operator() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    assert_evaluates_to(&a, not(&a, a.boolean(true)), Value::FALSE);
    assert_evaluates_to(&a, not(&a, a.boolean(false)), Value::TRUE);
    assert_evaluates_to(&a, not(&a, a.int(5)), Value::FALSE);
    assert_evaluates_to(&a, not(&a, not(&a, a.boolean(true))), Value::TRUE);
    assert_evaluates_to(&a, not(&a, not(&a, a.int(5))), Value::TRUE);
    // Zero is not special.
    assert_evaluates_to(&a, not(&a, a.int(0)), Value::FALSE);
}

#[test]
fn test_bang_of_null_is_false() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    // !(if (false) { 5 })
    let null = a.if_expr(a.boolean(false), a.block(&[a.expr_stmt(a.int(5))]), None);
    assert_evaluates_to(&a, a.prefix(PrefixOp::Not, null), Value::FALSE);
}

#[test]
fn test_null_equality() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);
    let null = || a.if_expr(a.boolean(false), a.block(&[a.expr_stmt(a.int(1))]), None);

    assert_evaluates_to(&a, a.infix(InfixOp::Eq, null(), null()), Value::TRUE);
    assert_evaluates_to(&a, a.infix(InfixOp::NotEq, null(), a.boolean(false)), Value::TRUE);
    assert_evaluates_to(&a, a.infix(InfixOp::Eq, a.boolean(true), null()), Value::FALSE);
}

// === Conditionals ===

#[test]
fn test_conditionals() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);
    let block = |v| a.block(&[a.expr_stmt(a.int(v))]);

    let cases = [
        (a.boolean(true), None, Value::Integer(10)),
        (a.boolean(true), Some(block(20)), Value::Integer(10)),
        (a.boolean(false), Some(block(20)), Value::Integer(20)),
        (a.int(1), None, Value::Integer(10)),
        (a.infix(InfixOp::Lt, a.int(1), a.int(2)), None, Value::Integer(10)),
        (a.infix(InfixOp::Lt, a.int(1), a.int(2)), Some(block(20)), Value::Integer(10)),
        (a.infix(InfixOp::Gt, a.int(1), a.int(2)), Some(block(20)), Value::Integer(20)),
        (a.infix(InfixOp::Gt, a.int(1), a.int(2)), None, Value::NULL),
        (a.boolean(false), None, Value::NULL),
    ];
    for (condition, alternative, expected) in cases {
        assert_evaluates_to(&a, a.if_expr(condition, block(10), alternative), expected);
    }
}

#[test]
fn test_truthiness_of_null_and_zero() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);
    let block = |v| a.block(&[a.expr_stmt(a.int(v))]);

    // if (0) { 10 } else { 20 }
    assert_evaluates_to(
        &a,
        a.if_expr(a.int(0), block(10), Some(block(20))),
        Value::Integer(10),
    );

    // if ((if (false) { 10 })) { 10 } else { 20 }
    let null = a.if_expr(a.boolean(false), block(10), None);
    assert_evaluates_to(
        &a,
        a.if_expr(null, block(10), Some(block(20))),
        Value::Integer(10),
    );
}

#[test]
fn test_conditional_followed_by_statement() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    // if (true) { 10 }; 3333;
    let conditional = a.if_expr(a.boolean(true), a.block(&[a.expr_stmt(a.int(10))]), None);
    assert_eq!(run(&a, &[conditional, a.int(3333)]), Ok(Value::Integer(3333)));
}

#[test]
fn test_only_taken_branch_runs() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    // if (false) { 10 } else { 20 }
    let p = program(
        &a,
        &[a.if_expr(
            a.boolean(false),
            a.block(&[a.expr_stmt(a.int(10))]),
            Some(a.block(&[a.expr_stmt(a.int(20))])),
        )],
    );
    let bytecode = compile(&p).unwrap();

    // The whole program needs a single slot: the skipped branch never pushes.
    let options = ExecutionOptions { stack_size: 1 };
    assert_eq!(Vm::execute(&bytecode, &options), Ok(Value::Integer(20)));
}

#[test]
fn test_conditional_as_operand() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    // (if (true) { 1 } else { 2 }) + 40
    let conditional = a.if_expr(
        a.boolean(true),
        a.block(&[a.expr_stmt(a.int(1))]),
        Some(a.block(&[a.expr_stmt(a.int(2))])),
    );
    assert_evaluates_to(&a, a.infix(InfixOp::Add, conditional, a.int(40)), Value::Integer(41));
}

// === Determinism ===

#[test]
fn test_fresh_vms_agree() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    let p = program(&a, &[a.infix(InfixOp::Mul, a.int(6), a.int(7))]);
    let bytecode = compile(&p).unwrap();

    let mut first = Vm::new(&bytecode);
    first.run().unwrap();
    let mut second = Vm::new(&bytecode);
    second.run().unwrap();
    assert_eq!(first.last_popped_value(), second.last_popped_value());
    assert_eq!(first.last_popped_value(), Value::Integer(42));
    assert_eq!(first.stack_top(), None);
}

// === Errors ===

#[test]
fn test_negating_boolean_is_type_error() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    let err = run(&a, &[a.prefix(PrefixOp::Neg, a.boolean(true))]).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::UnsupportedNegation {
            operand: ValueType::Boolean
        }
    );
    assert_eq!(crate::format!("{}", err), "unsupported type for negation: BOOLEAN");
}

#[test]
fn test_arithmetic_type_errors() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    let err = run(&a, &[a.infix(InfixOp::Add, a.boolean(true), a.int(1))]).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::UnsupportedBinaryTypes {
            left: ValueType::Boolean,
            right: ValueType::Integer,
        }
    );
    assert_eq!(
        crate::format!("{}", err),
        "unsupported types for binary operation: BOOLEAN, INTEGER"
    );
}

#[test]
fn test_comparison_errors() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    // Integers never go through the singleton path.
    assert_eq!(
        run(&a, &[a.infix(InfixOp::Eq, a.int(1), a.boolean(true))]),
        Err(RuntimeError::UnknownOperator {
            op: Opcode::Equal,
            left: ValueType::Integer,
            right: ValueType::Boolean,
        })
    );
    assert_eq!(
        run(&a, &[a.infix(InfixOp::Gt, a.boolean(true), a.boolean(false))]),
        Err(RuntimeError::UnknownOperator {
            op: Opcode::GreaterThan,
            left: ValueType::Boolean,
            right: ValueType::Boolean,
        })
    );
}

#[test]
fn test_checked_arithmetic() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    assert_eq!(
        run(&a, &[a.infix(InfixOp::Div, a.int(1), a.int(0))]),
        Err(RuntimeError::DivisionByZero)
    );
    assert_eq!(
        run(&a, &[a.infix(InfixOp::Add, a.int(i64::MAX), a.int(1))]),
        Err(RuntimeError::IntegerOverflow { op: Opcode::Add })
    );
    assert_eq!(
        run(&a, &[a.prefix(PrefixOp::Neg, a.int(i64::MIN))]),
        Err(RuntimeError::IntegerOverflow { op: Opcode::Minus })
    );
    assert_eq!(
        run(&a, &[a.infix(InfixOp::Div, a.int(i64::MIN), a.prefix(PrefixOp::Neg, a.int(1)))]),
        Err(RuntimeError::IntegerOverflow { op: Opcode::Div })
    );
}

#[test]
fn test_stack_overflow() {
    let bytecode = raw_bytecode(
        &[
            (Opcode::Constant, &[0]),
            (Opcode::Constant, &[1]),
            (Opcode::Constant, &[2]),
        ],
        vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)],
    );

    let mut vm = Vm::with_options(&bytecode, &ExecutionOptions { stack_size: 2 });
    assert_eq!(vm.run(), Err(RuntimeError::StackOverflow { capacity: 2 }));
    // Values below the limit are intact.
    assert_eq!(vm.stack_top(), Some(Value::Integer(2)));
}

#[test]
fn test_stack_overflow_from_compiled_program() {
    let arena = Bump::new();
    let a = AstBuilder::new(&arena);

    // 1 + (2 + 3) needs three slots.
    let p = program(
        &a,
        &[a.infix(InfixOp::Add, a.int(1), a.infix(InfixOp::Add, a.int(2), a.int(3)))],
    );
    let bytecode = compile(&p).unwrap();
    assert_eq!(
        Vm::execute(&bytecode, &ExecutionOptions { stack_size: 2 }),
        Err(RuntimeError::StackOverflow { capacity: 2 })
    );
    assert_eq!(
        Vm::execute(&bytecode, &ExecutionOptions { stack_size: 3 }),
        Ok(Value::Integer(6))
    );
}

#[test]
fn test_malformed_instruction_streams() {
    let bytecode = Bytecode::new(Instructions::from(vec![0xFFu8]), vec![]);
    assert_eq!(
        Vm::new(&bytecode).run(),
        Err(RuntimeError::InvalidOpcode {
            source: InvalidOpcode(0xFF),
            ip: 0,
        })
    );

    let bytecode = Bytecode::new(
        Instructions::from(vec![Opcode::True as u8, Opcode::Constant as u8, 0]),
        vec![],
    );
    assert_eq!(
        Vm::new(&bytecode).run(),
        Err(RuntimeError::TruncatedInstruction {
            op: Opcode::Constant,
            ip: 1,
        })
    );

    let bytecode = raw_bytecode(&[(Opcode::Constant, &[3])], vec![]);
    assert_eq!(
        Vm::new(&bytecode).run(),
        Err(RuntimeError::ConstantOutOfRange { index: 3, len: 0 })
    );

    // Each of these decodes and validates but pops more than was pushed.
    let underflowing: [&[(Opcode, &[usize])]; 5] = [
        &[(Opcode::Pop, &[])],
        &[(Opcode::Add, &[])],
        &[(Opcode::True, &[]), (Opcode::Equal, &[])],
        &[(Opcode::Minus, &[])],
        &[(Opcode::JumpNotTruthy, &[3])],
    ];
    for parts in underflowing {
        let bytecode = raw_bytecode(parts, vec![]);
        assert_eq!(bytecode.validate(), Ok(()));
        assert_eq!(Vm::new(&bytecode).run(), Err(RuntimeError::StackUnderflow));
    }

    let bytecode = raw_bytecode(&[(Opcode::Bang, &[])], vec![]);
    assert_eq!(
        Vm::execute(&bytecode, &ExecutionOptions::default()),
        Err(RuntimeError::StackUnderflow)
    );
}

#[test]
fn test_empty_program() {
    let bytecode = Bytecode::new(Instructions::new(), vec![]);
    let mut vm = Vm::new(&bytecode);
    assert_eq!(vm.run(), Ok(()));
    assert_eq!(vm.last_popped_value(), Value::NULL);
    assert_eq!(vm.stack_top(), None);
}
