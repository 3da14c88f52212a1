//! Storing compiled programs and running them later.

mod cases;

use monk::{
    Bytecode, BytecodeError, Error, ExecutionOptions, Instructions, Opcode, RuntimeError, Value,
    ast::{AstBuilder, InfixOp},
    compile, make,
};
use pretty_assertions::assert_eq;

#[test]
fn stored_bytecode_runs_like_the_original() {
    cases::init_logging();
    let arena = bumpalo::Bump::new();
    let ast = AstBuilder::new(&arena);

    // if (10 > 5) { 10 - 5 } else { 0 }
    let program = ast.program(&[ast.expr_stmt(ast.if_expr(
        ast.infix(InfixOp::Gt, ast.int(10), ast.int(5)),
        ast.block(&[ast.expr_stmt(ast.infix(InfixOp::Sub, ast.int(10), ast.int(5)))]),
        Some(ast.block(&[ast.expr_stmt(ast.int(0))])),
    ))]);
    let bytecode = compile(&program).unwrap();
    let bytes = bytecode.to_bytes().unwrap();

    let options = ExecutionOptions::default();
    assert_eq!(monk::run_bytes(&bytes, &options), Ok(Value::Integer(5)));
    assert_eq!(monk::run(&program), Ok(Value::Integer(5)));
}

#[test]
fn hand_assembled_bytecode() {
    // 2 * 21
    let instructions: Instructions = [
        make(Opcode::Constant, &[0]).unwrap(),
        make(Opcode::Constant, &[1]).unwrap(),
        make(Opcode::Mul, &[]).unwrap(),
        make(Opcode::Pop, &[]).unwrap(),
    ]
    .into_iter()
    .collect();
    let bytecode = Bytecode::new(instructions, vec![Value::Integer(2), Value::Integer(21)]);
    assert_eq!(bytecode.validate(), Ok(()));

    let bytes = bytecode.to_bytes().unwrap();
    let options = ExecutionOptions::default();
    assert_eq!(monk::run_bytes(&bytes, &options), Ok(Value::Integer(42)));
}

#[test]
fn corrupted_bytecode_is_rejected_before_running() {
    let instructions: Instructions = [make(Opcode::Jump, &[2]).unwrap()].into_iter().collect();
    let bytes = Bytecode::new(instructions, vec![]).to_bytes().unwrap();

    let err = monk::run_bytes(&bytes, &ExecutionOptions::default()).unwrap_err();
    assert_eq!(
        err,
        Error::Bytecode(BytecodeError::InvalidJumpTarget {
            offset: 0,
            target: 2,
        })
    );
}

#[test]
fn underflowing_bytecode_fails_without_panicking() {
    for op in [Opcode::Pop, Opcode::Add, Opcode::Bang] {
        let instructions: Instructions = [make(op, &[]).unwrap()].into_iter().collect();
        let bytes = Bytecode::new(instructions, vec![]).to_bytes().unwrap();

        let err = monk::run_bytes(&bytes, &ExecutionOptions::default()).unwrap_err();
        assert_eq!(err, Error::Runtime(RuntimeError::StackUnderflow), "{op}");
        assert!(!err.is_resource_exceeded());
    }
}
