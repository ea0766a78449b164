//! Vectorized row filter.

use crate::common::error::EngineResult;
use crate::execution::context::ExecutionContext;
use crate::execution::operator::{check_cancelled, ChunkSource};
use crate::expression::ast::{CmpOp, Expr};
use crate::expression::compiler::compile_predicate;
use crate::expression::kernel::{vectorized_numeric_filter, PredicateKernel, VECTORIZED_FILTER_ROW_THRESHOLD};
use crate::types::chunk::SelectionVector;
use crate::types::physical_type::Kind;
use crate::types::schema::Schema;

/// Applies a compiled predicate to every input chunk, producing a chunk
/// with a narrowed selection vector. Falls back to scanning and dropping
/// a chunk entirely when no row passes, and to passing it through
/// unmodified when every row passes (mirrors the all-pass / none-pass
/// short circuits in a hand-rolled table scan).
pub struct FilterOperator {
    input: Box<dyn ChunkSource>,
    predicate: PredicateKernel,
    vectorized: Option<(usize, fn(f64, f64) -> bool, f64)>,
    ctx: ExecutionContext,
}

impl FilterOperator {
    pub fn new(input: Box<dyn ChunkSource>, expr: &Expr, schema: &Schema, ctx: ExecutionContext) -> EngineResult<Self> {
        let predicate = compile_predicate(expr, schema)?;
        let vectorized = detect_vectorizable(expr, schema);
        Ok(Self { input, predicate, vectorized, ctx })
    }
}

fn detect_vectorizable(expr: &Expr, schema: &Schema) -> Option<(usize, fn(f64, f64) -> bool, f64)> {
    let Expr::Cmp(op, l, r) = expr else { return None };
    let (Expr::Column(name), Expr::Literal(lit)) = (l.as_ref(), r.as_ref()) else { return None };
    let idx = schema.index_of(name)?;
    let kind = schema.column(idx)?.dtype.kind;
    if !matches!(kind, Kind::Int32 | Kind::Float64) {
        return None;
    }
    let literal = lit.as_f64()?;
    let cmp: fn(f64, f64) -> bool = match op {
        CmpOp::Eq => |a, b| a == b,
        CmpOp::Ne => |a, b| a != b,
        CmpOp::Lt => |a, b| a < b,
        CmpOp::Le => |a, b| a <= b,
        CmpOp::Gt => |a, b| a > b,
        CmpOp::Ge => |a, b| a >= b,
    };
    Some((idx, cmp, literal))
}

impl ChunkSource for FilterOperator {
    fn next(&mut self) -> EngineResult<Option<crate::types::chunk::Chunk>> {
        check_cancelled(&self.ctx)?;
        loop {
            let Some(mut chunk) = self.input.next()? else {
                return Ok(None);
            };
            let row_count = chunk.row_count();

            let selection = if let Some((col_idx, cmp, literal)) = self.vectorized {
                if row_count >= VECTORIZED_FILTER_ROW_THRESHOLD {
                    vectorized_numeric_filter(&chunk, col_idx, cmp, literal)
                } else {
                    scalar_select(&chunk, &self.predicate)?
                }
            } else {
                scalar_select(&chunk, &self.predicate)?
            };

            if selection.is_empty() {
                continue; // none passed; pull the next chunk instead of yielding empty output
            }
            if selection.len() == row_count {
                // every surviving row already matches the chunk's current
                // selection (if any); leave it untouched rather than widening
                // back out to the full physical storage.
                return Ok(Some(chunk));
            }
            chunk.set_selection(Some(selection));
            return Ok(Some(chunk));
        }
    }
}

fn scalar_select(chunk: &crate::types::chunk::Chunk, predicate: &PredicateKernel) -> EngineResult<SelectionVector> {
    let mut sel = SelectionVector::new(Vec::with_capacity(chunk.row_count()));
    for row in 0..chunk.row_count() {
        if predicate(chunk, row)? {
            sel.push(chunk.physical_row(row));
        }
    }
    Ok(sel)
}
