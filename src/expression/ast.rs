//! Immutable expression tree. Built once via [`crate::expression::builder`],
//! type-checked and compiled via [`crate::expression::compiler`].

use std::sync::Arc;

use crate::types::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKind {
    Count,
    Sum,
    Min,
    Max,
    Avg,
    First,
    Last,
}

/// A node in the expression tree. `Arc` children let the same subexpression
/// be shared across an AST without cloning.
#[derive(Debug, Clone)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Cmp(CmpOp, Arc<Expr>, Arc<Expr>),
    Between(Arc<Expr>, Arc<Expr>, Arc<Expr>),
    IsNull(Arc<Expr>),
    IsNotNull(Arc<Expr>),
    Logical(LogicalOp, Arc<Expr>, Arc<Expr>),
    Not(Arc<Expr>),
    Arith(ArithOp, Arc<Expr>, Arc<Expr>),
    Neg(Arc<Expr>),
    StringOp(StringOp, Arc<Expr>, Arc<Expr>),
    Agg(AggKind, Arc<Expr>),
    /// `COUNT(*)`: no argument, just counts rows (including nulls) in a
    /// group.
    CountStar,
    Alias(Arc<Expr>, String),
    Cast(Arc<Expr>, crate::types::physical_type::Kind),
    Coalesce(Vec<Arc<Expr>>),
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Arc<Expr> {
        Arc::new(Expr::Column(name.into()))
    }

    pub fn lit(value: Value) -> Arc<Expr> {
        Arc::new(Expr::Literal(value))
    }

    pub fn alias(self: Arc<Expr>, name: impl Into<String>) -> Arc<Expr> {
        Arc::new(Expr::Alias(self, name.into()))
    }
}
