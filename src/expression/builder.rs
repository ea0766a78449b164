//! Ergonomic constructors for [`Expr`] trees.

use std::sync::Arc;

use crate::expression::ast::{AggKind, ArithOp, CmpOp, Expr, LogicalOp, StringOp};

pub fn eq(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Cmp(CmpOp::Eq, l, r))
}
pub fn ne(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Cmp(CmpOp::Ne, l, r))
}
pub fn lt(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Cmp(CmpOp::Lt, l, r))
}
pub fn le(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Cmp(CmpOp::Le, l, r))
}
pub fn gt(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Cmp(CmpOp::Gt, l, r))
}
pub fn ge(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Cmp(CmpOp::Ge, l, r))
}

pub fn and(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Logical(LogicalOp::And, l, r))
}
pub fn or(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Logical(LogicalOp::Or, l, r))
}
pub fn not(e: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Not(e))
}

pub fn between(e: Arc<Expr>, lo: Arc<Expr>, hi: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Between(e, lo, hi))
}
pub fn is_null(e: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::IsNull(e))
}
pub fn is_not_null(e: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::IsNotNull(e))
}

pub fn add(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Arith(ArithOp::Add, l, r))
}
pub fn sub(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Arith(ArithOp::Sub, l, r))
}
pub fn mul(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Arith(ArithOp::Mul, l, r))
}
pub fn div(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Arith(ArithOp::Div, l, r))
}
pub fn modulo(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Arith(ArithOp::Mod, l, r))
}
pub fn neg(e: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Neg(e))
}

pub fn contains(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::StringOp(StringOp::Contains, l, r))
}
pub fn starts_with(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::StringOp(StringOp::StartsWith, l, r))
}
pub fn ends_with(l: Arc<Expr>, r: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::StringOp(StringOp::EndsWith, l, r))
}

pub fn count(e: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Agg(AggKind::Count, e))
}
pub fn count_star() -> Arc<Expr> {
    Arc::new(Expr::CountStar)
}
pub fn sum(e: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Agg(AggKind::Sum, e))
}
pub fn min(e: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Agg(AggKind::Min, e))
}
pub fn max(e: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Agg(AggKind::Max, e))
}
pub fn avg(e: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Agg(AggKind::Avg, e))
}
pub fn first(e: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Agg(AggKind::First, e))
}
pub fn last(e: Arc<Expr>) -> Arc<Expr> {
    Arc::new(Expr::Agg(AggKind::Last, e))
}

pub fn coalesce(exprs: Vec<Arc<Expr>>) -> Arc<Expr> {
    Arc::new(Expr::Coalesce(exprs))
}
