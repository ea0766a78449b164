//! Type-checks an [`Expr`] against a [`Schema`] and compiles it into a
//! [`ValueKernel`] / [`PredicateKernel`].

use std::sync::Arc;

use crate::common::error::{EngineError, EngineResult};
use crate::expression::ast::{AggKind, ArithOp, CmpOp, Expr, LogicalOp, StringOp};
use crate::expression::kernel::{read_column_value, PredicateKernel, ValueKernel};
use crate::types::dtype::DType;
use crate::types::physical_type::Kind;
use crate::types::schema::Schema;
use crate::types::value::Value;

/// Infer the result type of `expr` evaluated against `schema`, without
/// compiling a kernel. Used by planners/tests that only need the output
/// schema (e.g. Project).
pub fn infer_type(expr: &Expr, schema: &Schema) -> EngineResult<DType> {
    Ok(match expr {
        Expr::Column(name) => {
            schema
                .column_by_name(name)
                .ok_or_else(|| EngineError::InvalidArgument { message: format!("unknown column '{name}'") })?
                .dtype
        }
        Expr::Literal(v) => DType::new(v.kind().unwrap_or(Kind::Int64), v.is_null()),
        Expr::Cmp(..) | Expr::Between(..) | Expr::IsNull(_) | Expr::IsNotNull(_) | Expr::Logical(..) | Expr::Not(_) => {
            DType::not_null(Kind::Boolean)
        }
        Expr::Arith(op, l, r) => {
            let lt = infer_type(l, schema)?;
            let rt = infer_type(r, schema)?;
            let promoted = DType::promote(lt.kind, rt.kind).ok_or_else(|| EngineError::TypeMismatch {
                column: String::new(),
                expected: "numeric".into(),
                found: format!("{lt}/{rt}"),
            })?;
            // Integral operands accumulate/divide as Int64 (overflow and
            // integer div-by-zero are errors); anything involving a float
            // evaluates through f64, where div-by-zero is Null.
            let nullable = lt.nullable || rt.nullable || matches!(op, ArithOp::Div | ArithOp::Mod);
            if promoted.is_integral() {
                DType::new(Kind::Int64, nullable)
            } else {
                DType::new(Kind::Float64, nullable)
            }
        }
        Expr::Neg(e) => infer_type(e, schema)?,
        Expr::StringOp(..) => DType::not_null(Kind::Boolean),
        Expr::Agg(AggKind::Count, _) | Expr::CountStar => DType::not_null(Kind::Int64),
        Expr::Agg(AggKind::Avg, _) => DType::nullable(Kind::Float64),
        Expr::Agg(_, e) => DType::new(infer_type(e, schema)?.kind, true),
        Expr::Alias(inner, _) => infer_type(inner, schema)?,
        Expr::Cast(_, kind) => DType::nullable(*kind),
        Expr::Coalesce(exprs) => {
            let mut kind = None;
            let mut nullable = true;
            for e in exprs {
                let t = infer_type(e, schema)?;
                kind = kind.or(Some(t.kind));
                nullable = nullable && t.nullable;
            }
            DType::new(kind.ok_or_else(|| EngineError::InvalidArgument {
                message: "COALESCE requires at least one argument".into(),
            })?, nullable)
        }
    })
}

/// Compile `expr` into a value-producing kernel plus its inferred type.
pub fn compile(expr: &Expr, schema: &Schema) -> EngineResult<(DType, ValueKernel)> {
    let dtype = infer_type(expr, schema)?;
    let kernel = compile_value(expr, schema)?;
    Ok((dtype, kernel))
}

fn compile_value(expr: &Expr, schema: &Schema) -> EngineResult<ValueKernel> {
    match expr {
        Expr::Column(name) => {
            let idx = schema
                .index_of(name)
                .ok_or_else(|| EngineError::InvalidArgument { message: format!("unknown column '{name}'") })?;
            Ok(Arc::new(move |chunk, row| Ok(read_column_value(chunk, idx, row))))
        }
        Expr::Literal(v) => {
            let v = v.clone();
            Ok(Arc::new(move |_chunk, _row| Ok(v.clone())))
        }
        Expr::Alias(inner, _) => compile_value(inner, schema),
        Expr::Not(inner) => {
            let pred = compile_predicate(inner, schema)?;
            Ok(Arc::new(move |chunk, row| Ok(Value::Boolean(!pred(chunk, row)?))))
        }
        Expr::Cmp(..) | Expr::Between(..) | Expr::IsNull(_) | Expr::IsNotNull(_) | Expr::Logical(..) | Expr::StringOp(..) => {
            let pred = compile_predicate(expr, schema)?;
            Ok(Arc::new(move |chunk, row| Ok(Value::Boolean(pred(chunk, row)?))))
        }
        Expr::Arith(op, l, r) => {
            let lk = compile_value(l, schema)?;
            let rk = compile_value(r, schema)?;
            let op = *op;
            // best-effort column name for DivisionByZero/Overflow context
            let context_column = match l.as_ref() {
                Expr::Column(name) => name.clone(),
                _ => String::new(),
            };
            Ok(Arc::new(move |chunk, row| {
                let lv = lk(chunk, row)?;
                let rv = rk(chunk, row)?;
                eval_arith(op, &lv, &rv, &context_column, row)
            }))
        }
        Expr::Neg(e) => {
            let k = compile_value(e, schema)?;
            Ok(Arc::new(move |chunk, row| {
                Ok(match k(chunk, row)? {
                    Value::Int32(v) => Value::Int32(-v),
                    Value::Int64(v) => Value::Int64(-v),
                    Value::Float32(v) => Value::Float32(-v),
                    Value::Float64(v) => Value::Float64(-v),
                    _ => Value::Null,
                })
            }))
        }
        Expr::Coalesce(exprs) => {
            let kernels: Vec<ValueKernel> = exprs.iter().map(|e| compile_value(e, schema)).collect::<EngineResult<_>>()?;
            Ok(Arc::new(move |chunk, row| {
                for k in &kernels {
                    let v = k(chunk, row)?;
                    if !v.is_null() {
                        return Ok(v);
                    }
                }
                Ok(Value::Null)
            }))
        }
        Expr::Cast(inner, kind) => {
            let k = compile_value(inner, schema)?;
            let kind = *kind;
            Ok(Arc::new(move |chunk, row| Ok(cast_value(&k(chunk, row)?, kind))))
        }
        Expr::Agg(..) | Expr::CountStar => Err(EngineError::InvalidArgument {
            message: "aggregate expressions can only be compiled by the GroupBy operator".into(),
        }),
    }
}

/// Compile `expr` into a boolean predicate for use by Filter. Nulls
/// propagate to `false` (an unknown predicate never passes a row).
pub fn compile_predicate(expr: &Expr, schema: &Schema) -> EngineResult<PredicateKernel> {
    match expr {
        Expr::Cmp(op, l, r) => {
            let lk = compile_value(l, schema)?;
            let rk = compile_value(r, schema)?;
            let op = *op;
            Ok(Arc::new(move |chunk, row| {
                let lv = lk(chunk, row)?;
                let rv = rk(chunk, row)?;
                if lv.is_null() || rv.is_null() {
                    return Ok(false);
                }
                Ok(eval_cmp(op, &lv, &rv))
            }))
        }
        Expr::Between(e, lo, hi) => {
            let ek = compile_value(e, schema)?;
            let lok = compile_value(lo, schema)?;
            let hik = compile_value(hi, schema)?;
            Ok(Arc::new(move |chunk, row| {
                let v = ek(chunk, row)?;
                let l = lok(chunk, row)?;
                let h = hik(chunk, row)?;
                if v.is_null() || l.is_null() || h.is_null() {
                    return Ok(false);
                }
                Ok(eval_cmp(CmpOp::Ge, &v, &l) && eval_cmp(CmpOp::Le, &v, &h))
            }))
        }
        Expr::IsNull(e) => {
            let k = compile_value(e, schema)?;
            Ok(Arc::new(move |chunk, row| Ok(k(chunk, row)?.is_null())))
        }
        Expr::IsNotNull(e) => {
            let k = compile_value(e, schema)?;
            Ok(Arc::new(move |chunk, row| Ok(!k(chunk, row)?.is_null())))
        }
        Expr::Logical(op, l, r) => {
            let lk = compile_predicate(l, schema)?;
            let rk = compile_predicate(r, schema)?;
            let op = *op;
            Ok(Arc::new(move |chunk, row| match op {
                LogicalOp::And => Ok(lk(chunk, row)? && rk(chunk, row)?),
                LogicalOp::Or => Ok(lk(chunk, row)? || rk(chunk, row)?),
            }))
        }
        Expr::Not(e) => {
            let k = compile_predicate(e, schema)?;
            Ok(Arc::new(move |chunk, row| Ok(!k(chunk, row)?)))
        }
        Expr::StringOp(op, l, r) => {
            let lk = compile_value(l, schema)?;
            let rk = compile_value(r, schema)?;
            let op = *op;
            Ok(Arc::new(move |chunk, row| {
                let (lv, rv) = (lk(chunk, row)?, rk(chunk, row)?);
                Ok(match (lv, rv) {
                    (Value::String(a), Value::String(b)) => match op {
                        StringOp::Contains => a.contains(&b),
                        StringOp::StartsWith => a.starts_with(&b),
                        StringOp::EndsWith => a.ends_with(&b),
                    },
                    _ => false,
                })
            }))
        }
        other => {
            let k = compile_value(other, schema)?;
            Ok(Arc::new(move |chunk, row| Ok(matches!(k(chunk, row)?, Value::Boolean(true)))))
        }
    }
}

fn eval_cmp(op: CmpOp, l: &Value, r: &Value) -> bool {
    let ord = match l.partial_cmp(r) {
        Some(o) => o,
        None => return false,
    };
    match op {
        CmpOp::Eq => ord.is_eq(),
        CmpOp::Ne => !ord.is_eq(),
        CmpOp::Lt => ord.is_lt(),
        CmpOp::Le => ord.is_le(),
        CmpOp::Gt => ord.is_gt(),
        CmpOp::Ge => ord.is_ge(),
    }
}

/// Integral operands (Int*/UInt*) accumulate and divide as `Int64`: overflow
/// is `Overflow`, div/mod by zero is `DivisionByZero`. Anything involving a
/// float evaluates through `f64`, where div/mod by zero is `Null` rather
/// than an error.
fn eval_arith(op: ArithOp, l: &Value, r: &Value, column: &str, row: usize) -> EngineResult<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    let both_integral = l.kind().map(Kind::is_integral).unwrap_or(false) && r.kind().map(Kind::is_integral).unwrap_or(false);
    if both_integral {
        let (Some(li), Some(ri)) = (l.as_i64(), r.as_i64()) else {
            return Ok(Value::Null);
        };
        let result = match op {
            ArithOp::Add => li.checked_add(ri),
            ArithOp::Sub => li.checked_sub(ri),
            ArithOp::Mul => li.checked_mul(ri),
            ArithOp::Div => {
                if ri == 0 {
                    return Err(EngineError::DivisionByZero { column: column.to_string(), row });
                }
                li.checked_div(ri)
            }
            ArithOp::Mod => {
                if ri == 0 {
                    return Err(EngineError::DivisionByZero { column: column.to_string(), row });
                }
                li.checked_rem(ri)
            }
        };
        return result
            .map(Value::Int64)
            .ok_or_else(|| EngineError::Overflow { column: column.to_string(), row });
    }
    let (Some(lf), Some(rf)) = (l.as_f64(), r.as_f64()) else {
        return Ok(Value::Null);
    };
    let result = match op {
        ArithOp::Add => lf + rf,
        ArithOp::Sub => lf - rf,
        ArithOp::Mul => lf * rf,
        ArithOp::Div => {
            if rf == 0.0 {
                return Ok(Value::Null);
            }
            lf / rf
        }
        ArithOp::Mod => {
            if rf == 0.0 {
                return Ok(Value::Null);
            }
            lf % rf
        }
    };
    Ok(Value::Float64(result))
}

fn cast_value(v: &Value, kind: Kind) -> Value {
    if v.is_null() {
        return Value::Null;
    }
    match kind {
        Kind::Float64 => v.as_f64().map(Value::Float64).unwrap_or(Value::Null),
        Kind::Int32 => v.as_f64().map(|f| Value::Int32(f as i32)).unwrap_or(Value::Null),
        Kind::Int64 => v.as_f64().map(|f| Value::Int64(f as i64)).unwrap_or(Value::Null),
        _ => v.clone(),
    }
}
