//! Row-count limiting with an optional offset.

use crate::common::error::EngineResult;
use crate::execution::context::ExecutionContext;
use crate::execution::operator::{check_cancelled, ChunkSource};
use crate::types::chunk::{Chunk, SelectionVector};

pub struct LimitOperator {
    input: Box<dyn ChunkSource>,
    remaining_offset: usize,
    remaining_limit: usize,
    ctx: ExecutionContext,
}

impl LimitOperator {
    pub fn new(input: Box<dyn ChunkSource>, limit: usize, offset: usize, ctx: ExecutionContext) -> Self {
        Self { input, remaining_offset: offset, remaining_limit: limit, ctx }
    }
}

impl ChunkSource for LimitOperator {
    fn next(&mut self) -> EngineResult<Option<Chunk>> {
        check_cancelled(&self.ctx)?;
        if self.remaining_limit == 0 {
            return Ok(None);
        }
        loop {
            let Some(mut chunk) = self.input.next()? else {
                return Ok(None);
            };
            let row_count = chunk.row_count();

            if self.remaining_offset >= row_count {
                self.remaining_offset -= row_count;
                continue;
            }

            let start = self.remaining_offset;
            self.remaining_offset = 0;
            let take = (row_count - start).min(self.remaining_limit);
            self.remaining_limit -= take;

            if start == 0 && take == row_count {
                return Ok(Some(chunk));
            }
            let indices: Vec<usize> = (start..start + take).map(|i| chunk.physical_row(i)).collect();
            chunk.set_selection(Some(SelectionVector::new(indices)));
            return Ok(Some(chunk));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operator::VecChunkSource;
    use crate::types::column_buffer::ColumnBuffer;
    use crate::types::dictionary::Dictionary;
    use crate::types::dtype::DType;
    use crate::types::physical_type::Kind;
    use crate::types::schema::{ColumnDescriptor, Schema};
    use crate::types::value::Value;
    use std::sync::Arc;

    fn chunk(values: &[i32]) -> Chunk {
        let schema = Arc::new(Schema::new(vec![ColumnDescriptor::new("a", DType::not_null(Kind::Int32))]).unwrap());
        let mut col = ColumnBuffer::with_capacity(Kind::Int32, false, values.len());
        for v in values {
            col.push(&Value::Int32(*v)).unwrap();
        }
        Chunk::new(schema, vec![col], Dictionary::new()).unwrap()
    }

    #[test]
    fn limit_truncates_across_chunk_boundary() {
        let source = VecChunkSource::new(vec![chunk(&[1, 2, 3]), chunk(&[4, 5])]);
        let mut op = LimitOperator::new(Box::new(source), 4, 0, ExecutionContext::unbounded());
        let first = op.next().unwrap().unwrap();
        assert_eq!(first.row_count(), 3);
        let second = op.next().unwrap().unwrap();
        assert_eq!(second.row_count(), 1);
        assert!(op.next().unwrap().is_none());
    }

    #[test]
    fn offset_skips_leading_rows() {
        let source = VecChunkSource::new(vec![chunk(&[1, 2, 3])]);
        let mut op = LimitOperator::new(Box::new(source), 10, 1, ExecutionContext::unbounded());
        let out = op.next().unwrap().unwrap();
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.columns()[0].get_raw::<i32>(out.physical_row(0)), Some(2));
    }
}
