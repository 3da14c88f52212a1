//! Syntax tree consumed by the compiler.
//!
//! The tree is produced by an external parser and lives in a `Bump` arena:
//! every child node is a `&'a` reference into the same arena, mirroring how
//! parsed expressions are stored elsewhere in the toolchain. [`AstBuilder`]
//! is the convenience front door for hosts and tests that assemble trees by
//! hand.

use core::fmt;

use bumpalo::Bump;

/// A whole program: statements in source order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Program<'a> {
    pub statements: &'a [Statement<'a>],
}

/// A `{ ... }` block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'a> {
    pub statements: &'a [Statement<'a>],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statement<'a> {
    Let { name: &'a str, value: &'a Expr<'a> },
    Return(&'a Expr<'a>),
    Expression(&'a Expr<'a>),
    Block(Block<'a>),
}

impl Statement<'_> {
    /// Node kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Let { .. } => "let statement",
            Statement::Return(_) => "return statement",
            Statement::Expression(_) => "expression statement",
            Statement::Block(_) => "block statement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'a> {
    Integer(i64),
    Boolean(bool),
    Str(&'a str),
    Ident(&'a str),
    Prefix {
        op: PrefixOp,
        operand: &'a Expr<'a>,
    },
    Infix {
        op: InfixOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    If {
        condition: &'a Expr<'a>,
        consequence: Block<'a>,
        alternative: Option<Block<'a>>,
    },
}

impl Expr<'_> {
    /// Node kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Integer(_) => "integer literal",
            Expr::Boolean(_) => "boolean literal",
            Expr::Str(_) => "string literal",
            Expr::Ident(_) => "identifier",
            Expr::Prefix { .. } => "prefix expression",
            Expr::Infix { .. } => "infix expression",
            Expr::If { .. } => "if expression",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PrefixOp {
    Neg,
    Not,
    Plus,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrefixOp::Neg => "-",
            PrefixOp::Not => "!",
            PrefixOp::Plus => "+",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Mod => "%",
            InfixOp::Lt => "<",
            InfixOp::Gt => ">",
            InfixOp::LtEq => "<=",
            InfixOp::GtEq => ">=",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
        })
    }
}

/// Allocates syntax tree nodes in an arena.
///
/// ```ignore
/// let arena = Bump::new();
/// let ast = AstBuilder::new(&arena);
/// // 1 + 2;
/// let program = ast.program(&[ast.expr_stmt(ast.infix(InfixOp::Add, ast.int(1), ast.int(2)))]);
/// ```
#[derive(Clone, Copy)]
pub struct AstBuilder<'a> {
    arena: &'a Bump,
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self { arena }
    }

    pub fn int(&self, value: i64) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Integer(value))
    }

    pub fn boolean(&self, value: bool) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Boolean(value))
    }

    pub fn str(&self, value: &str) -> &'a Expr<'a> {
        let value = self.arena.alloc_str(value);
        self.arena.alloc(Expr::Str(value))
    }

    pub fn ident(&self, name: &str) -> &'a Expr<'a> {
        let name = self.arena.alloc_str(name);
        self.arena.alloc(Expr::Ident(name))
    }

    pub fn prefix(&self, op: PrefixOp, operand: &'a Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Prefix { op, operand })
    }

    pub fn infix(&self, op: InfixOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(Expr::Infix { op, left, right })
    }

    pub fn if_expr(
        &self,
        condition: &'a Expr<'a>,
        consequence: Block<'a>,
        alternative: Option<Block<'a>>,
    ) -> &'a Expr<'a> {
        self.arena.alloc(Expr::If {
            condition,
            consequence,
            alternative,
        })
    }

    pub fn block(&self, statements: &[Statement<'a>]) -> Block<'a> {
        Block {
            statements: self.arena.alloc_slice_copy(statements),
        }
    }

    pub fn expr_stmt(&self, expr: &'a Expr<'a>) -> Statement<'a> {
        Statement::Expression(expr)
    }

    pub fn let_stmt(&self, name: &str, value: &'a Expr<'a>) -> Statement<'a> {
        Statement::Let {
            name: self.arena.alloc_str(name),
            value,
        }
    }

    pub fn return_stmt(&self, value: &'a Expr<'a>) -> Statement<'a> {
        Statement::Return(value)
    }

    pub fn program(&self, statements: &[Statement<'a>]) -> Program<'a> {
        Program {
            statements: self.arena.alloc_slice_copy(statements),
        }
    }
}
