#![allow(dead_code)]

use once_cell::sync::Lazy;

static LOGGING: Lazy<()> = Lazy::new(|| {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
});

/// Installs the test subscriber once per test binary. `RUST_LOG=trace`
/// shows every emitted and dispatched instruction.
pub fn init_logging() {
    Lazy::force(&LOGGING);
}

/// Declares a test that builds a program and checks what running it yields.
///
/// `program` receives an `AstBuilder` and returns the program's statements;
/// `result` is the expected `monk::Result<Value>`.
#[macro_export]
macro_rules! test_case {
    (
        name: $name:ident,
        program: |$ast:ident| $statements:expr,
        result: $result:expr $(,)?
    ) => {
        #[test]
        fn $name() {
            $crate::cases::init_logging();
            let arena = bumpalo::Bump::new();
            let $ast = monk::ast::AstBuilder::new(&arena);
            let statements = $statements;
            let program = $ast.program(&statements);
            pretty_assertions::assert_eq!(monk::run(&program), $result);
        }
    };
}
