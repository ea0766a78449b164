//! In-memory multi-key sort. Pipeline-breaking: the first call to `next()`
//! drains the entire input before any output is produced.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::common::error::EngineResult;
use crate::execution::context::ExecutionContext;
use crate::execution::operator::{check_cancelled, ChunkSource};
use crate::expression::ast::Expr;
use crate::expression::compiler::compile;
use crate::expression::kernel::{read_column_value, ValueKernel};
use crate::types::chunk::Chunk;
use crate::types::column_buffer::ColumnBuffer;
use crate::types::dictionary::Dictionary;
use crate::types::physical_type::Kind;
use crate::types::schema::Schema;
use crate::types::value::Value;

pub struct SortKey {
    pub expr: Arc<Expr>,
    pub ascending: bool,
}

struct CompiledKey {
    kernel: ValueKernel,
    ascending: bool,
}

/// Buffers every input chunk, evaluates the sort keys once per row, and
/// emits the result back out in `output_chunk_size`-row batches. Uses a
/// stable sort so rows with equal keys keep their original relative order.
pub struct SortOperator {
    input: Option<Box<dyn ChunkSource>>,
    keys: Vec<SortKey>,
    schema: Arc<Schema>,
    output_chunk_size: usize,
    ctx: ExecutionContext,
    output: Option<std::vec::IntoIter<Chunk>>,
}

impl SortOperator {
    pub fn new(
        input: Box<dyn ChunkSource>,
        keys: Vec<SortKey>,
        schema: Arc<Schema>,
        output_chunk_size: usize,
        ctx: ExecutionContext,
    ) -> Self {
        Self { input: Some(input), keys, schema, output_chunk_size, ctx, output: None }
    }

    fn drain_and_sort(&mut self) -> EngineResult<()> {
        let mut input = self.input.take().expect("drain_and_sort called twice");
        let compiled: Vec<CompiledKey> = self
            .keys
            .iter()
            .map(|k| -> EngineResult<CompiledKey> {
                let (_dtype, kernel) = compile(&k.expr, &self.schema)?;
                Ok(CompiledKey { kernel, ascending: k.ascending })
            })
            .collect::<EngineResult<_>>()?;

        // Merge every source chunk's dictionary into one, remembering the
        // per-chunk remap so string values read back out are valid ids in
        // the merged dictionary.
        let mut chunks = Vec::new();
        let mut remaps = Vec::new();
        let mut dictionary = Dictionary::new();
        while let Some(chunk) = input.next()? {
            check_cancelled(&self.ctx)?;
            let materialized = chunk.materialize();
            remaps.push(dictionary.merge(materialized.dictionary()));
            chunks.push(materialized);
        }

        let mut rows: Vec<(usize, usize)> = Vec::new();
        let mut keys_by_row: Vec<Vec<Value>> = Vec::new();
        for (ci, chunk) in chunks.iter().enumerate() {
            for row in 0..chunk.row_count() {
                rows.push((ci, row));
                keys_by_row.push(compiled.iter().map(|k| (k.kernel)(chunk, row)).collect::<EngineResult<_>>()?);
            }
        }

        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by(|&a, &b| {
            for (i, key) in compiled.iter().enumerate() {
                let cmp = compare_with_nulls(&keys_by_row[a][i], &keys_by_row[b][i], key.ascending);
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });

        let mut output_chunks = Vec::new();
        for batch in order.chunks(self.output_chunk_size) {
            let mut columns = Vec::with_capacity(self.schema.len());
            for col_idx in 0..self.schema.len() {
                let descriptor = self.schema.column(col_idx).unwrap();
                let mut col = ColumnBuffer::with_capacity(descriptor.dtype.kind, descriptor.dtype.nullable, batch.len());
                for &row_idx in batch {
                    let (ci, ri) = rows[row_idx];
                    if descriptor.dtype.kind == Kind::String {
                        let id = chunks[ci].columns()[col_idx].get_dict_id(ri).map(|old_id| remaps[ci][old_id as usize]);
                        col.push_dict_id(id)?;
                    } else {
                        let value = read_column_value(&chunks[ci], col_idx, ri);
                        col.push(&value)?;
                    }
                }
                columns.push(col);
            }
            output_chunks.push(Chunk::new(self.schema.clone(), columns, dictionary.clone())?);
        }
        self.output = Some(output_chunks.into_iter());
        Ok(())
    }
}

/// Nulls sort first ascending, last descending, regardless of how the
/// non-null comparison itself is reversed by `ascending`.
fn compare_with_nulls(a: &Value, b: &Value, ascending: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => if ascending { Ordering::Less } else { Ordering::Greater },
        (false, true) => if ascending { Ordering::Greater } else { Ordering::Less },
        (false, false) => {
            let cmp = a.partial_cmp(b).unwrap_or(Ordering::Equal);
            if ascending { cmp } else { cmp.reverse() }
        }
    }
}

impl ChunkSource for SortOperator {
    fn next(&mut self) -> EngineResult<Option<Chunk>> {
        check_cancelled(&self.ctx)?;
        if self.output.is_none() {
            self.drain_and_sort()?;
        }
        Ok(self.output.as_mut().unwrap().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operator::VecChunkSource;
    use crate::types::dictionary::Dictionary;
    use crate::types::dtype::DType;
    use crate::types::schema::ColumnDescriptor;

    fn chunk(values: &[i32]) -> Chunk {
        let schema = Arc::new(Schema::new(vec![ColumnDescriptor::new("a", DType::not_null(Kind::Int32))]).unwrap());
        let mut col = ColumnBuffer::with_capacity(Kind::Int32, false, values.len());
        for v in values {
            col.push(&Value::Int32(*v)).unwrap();
        }
        Chunk::new(schema, vec![col], Dictionary::new()).unwrap()
    }

    #[test]
    fn sorts_ascending_across_chunk_boundaries() {
        let schema = Arc::new(Schema::new(vec![ColumnDescriptor::new("a", DType::not_null(Kind::Int32))]).unwrap());
        let source = VecChunkSource::new(vec![chunk(&[3, 1]), chunk(&[2])]);
        let keys = vec![SortKey { expr: Expr::column("a"), ascending: true }];
        let mut op = SortOperator::new(Box::new(source), keys, schema, 1024, ExecutionContext::unbounded());
        let out = op.next().unwrap().unwrap();
        let values: Vec<i32> = (0..out.row_count()).map(|r| out.columns()[0].get_raw::<i32>(r).unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn nulls_sort_first_ascending_last_descending() {
        let schema = Arc::new(Schema::new(vec![ColumnDescriptor::new("a", DType::nullable(Kind::Int32))]).unwrap());
        let mut col = ColumnBuffer::with_capacity(Kind::Int32, true, 3);
        col.push(&Value::Int32(2)).unwrap();
        col.push(&Value::Null).unwrap();
        col.push(&Value::Int32(1)).unwrap();
        let chunk = Chunk::new(schema.clone(), vec![col], Dictionary::new()).unwrap();

        let source = VecChunkSource::new(vec![chunk.clone()]);
        let keys = vec![SortKey { expr: Expr::column("a"), ascending: true }];
        let mut op = SortOperator::new(Box::new(source), keys, schema.clone(), 1024, ExecutionContext::unbounded());
        let out = op.next().unwrap().unwrap();
        let values: Vec<Option<i32>> = (0..out.row_count()).map(|r| out.columns()[0].get_raw::<i32>(r)).collect();
        assert_eq!(values, vec![None, Some(1), Some(2)]);

        let source = VecChunkSource::new(vec![chunk]);
        let keys = vec![SortKey { expr: Expr::column("a"), ascending: false }];
        let mut op = SortOperator::new(Box::new(source), keys, schema, 1024, ExecutionContext::unbounded());
        let out = op.next().unwrap().unwrap();
        let values: Vec<Option<i32>> = (0..out.row_count()).map(|r| out.columns()[0].get_raw::<i32>(r)).collect();
        assert_eq!(values, vec![Some(2), Some(1), None]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let schema = Arc::new(
            Schema::new(vec![
                ColumnDescriptor::new("k", DType::not_null(Kind::Int32)),
                ColumnDescriptor::new("orig_idx", DType::not_null(Kind::Int32)),
            ])
            .unwrap(),
        );
        let mut k = ColumnBuffer::with_capacity(Kind::Int32, false, 3);
        let mut idx = ColumnBuffer::with_capacity(Kind::Int32, false, 3);
        for (i, v) in [1, 1, 0].iter().enumerate() {
            k.push(&Value::Int32(*v)).unwrap();
            idx.push(&Value::Int32(i as i32)).unwrap();
        }
        let chunk = Chunk::new(schema.clone(), vec![k, idx], Dictionary::new()).unwrap();
        let source = VecChunkSource::new(vec![chunk]);
        let keys = vec![SortKey { expr: Expr::column("k"), ascending: true }];
        let mut op = SortOperator::new(Box::new(source), keys, schema, 1024, ExecutionContext::unbounded());
        let out = op.next().unwrap().unwrap();
        let order: Vec<i32> = (0..out.row_count()).map(|r| out.columns()[1].get_raw::<i32>(r).unwrap()).collect();
        assert_eq!(order, vec![2, 0, 1]);
    }
}
