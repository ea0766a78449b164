//! Deduplicates rows by a key expression list, keeping the first
//! occurrence. Pipeline-breaking like Sort and GroupBy.

use std::sync::Arc;

use ahash::AHashSet;

use crate::common::error::EngineResult;
use crate::execution::context::ExecutionContext;
use crate::execution::hash_table::{row_key, RowKey};
use crate::execution::operator::{check_cancelled, ChunkSource};
use crate::expression::ast::Expr;
use crate::expression::compiler::compile;
use crate::expression::kernel::ValueKernel;
use crate::types::chunk::Chunk;
use crate::types::schema::Schema;

pub struct UniqueOperator {
    input: Box<dyn ChunkSource>,
    key_kernels: Vec<ValueKernel>,
    seen: AHashSet<RowKey>,
    ctx: ExecutionContext,
}

impl UniqueOperator {
    pub fn new(input: Box<dyn ChunkSource>, keys: &[Arc<Expr>], schema: &Schema, ctx: ExecutionContext) -> EngineResult<Self> {
        let key_kernels = keys
            .iter()
            .map(|e| compile(e, schema).map(|(_, k)| k))
            .collect::<EngineResult<_>>()?;
        Ok(Self { input, key_kernels, seen: AHashSet::new(), ctx })
    }
}

impl ChunkSource for UniqueOperator {
    fn next(&mut self) -> EngineResult<Option<Chunk>> {
        check_cancelled(&self.ctx)?;
        loop {
            let Some(chunk) = self.input.next()? else {
                return Ok(None);
            };
            let mut keep = crate::types::chunk::SelectionVector::new(Vec::new());
            for row in 0..chunk.row_count() {
                let values: Vec<_> = self.key_kernels.iter().map(|k| k(&chunk, row)).collect::<EngineResult<_>>()?;
                let key = row_key(&values);
                if self.seen.insert(key) {
                    keep.push(row);
                }
            }
            if keep.is_empty() {
                continue;
            }
            let mut chunk = chunk;
            if keep.len() == chunk.row_count() {
                return Ok(Some(chunk));
            }
            // translate logical row indices (already selection-relative)
            // into physical ones before narrowing further
            let physical: Vec<usize> = keep.as_slice().iter().map(|&r| chunk.physical_row(r)).collect();
            chunk.set_selection(Some(crate::types::chunk::SelectionVector::new(physical)));
            return Ok(Some(chunk));
        }
    }
}
