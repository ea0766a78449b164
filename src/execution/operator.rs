//! The streaming `next() -> chunk | done` contract every physical operator
//! implements, plus adapters to drive one from an in-memory `Vec<Chunk>`.

use crate::common::error::{EngineError, EngineResult};
use crate::types::chunk::Chunk;

/// A producer of chunks. Operators wrap an upstream `ChunkSource` and are
/// themselves a `ChunkSource`, so a pipeline is a straight-line chain of
/// `Box<dyn ChunkSource>`.
pub trait ChunkSource: Send {
    /// Pull the next chunk, or `None` once exhausted. Returns
    /// `EngineError::Cancelled` if the context's cancellation token was
    /// tripped mid-pull.
    fn next(&mut self) -> EngineResult<Option<Chunk>>;
}

/// The simplest source: replays a fixed list of chunks, e.g. test fixtures
/// or materialized intermediate results fed back into another operator.
pub struct VecChunkSource {
    chunks: std::vec::IntoIter<Chunk>,
}

impl VecChunkSource {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks: chunks.into_iter() }
    }
}

impl ChunkSource for VecChunkSource {
    fn next(&mut self) -> EngineResult<Option<Chunk>> {
        Ok(self.chunks.next())
    }
}

/// Checks the context's cancellation token, used by every operator at the
/// top of `next()` before doing any work.
pub fn check_cancelled(ctx: &crate::execution::context::ExecutionContext) -> EngineResult<()> {
    if ctx.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::chunk::Chunk;
    use crate::types::column_buffer::ColumnBuffer;
    use crate::types::dictionary::Dictionary;
    use crate::types::dtype::DType;
    use crate::types::physical_type::Kind;
    use crate::types::schema::{ColumnDescriptor, Schema};
    use crate::types::value::Value;
    use std::sync::Arc;

    fn one_row_chunk(v: i32) -> Chunk {
        let schema = Arc::new(Schema::new(vec![ColumnDescriptor::new("a", DType::not_null(Kind::Int32))]).unwrap());
        let mut col = ColumnBuffer::with_capacity(Kind::Int32, false, 1);
        col.push(&Value::Int32(v)).unwrap();
        Chunk::new(schema, vec![col], Dictionary::new()).unwrap()
    }

    #[test]
    fn vec_source_replays_in_order_then_ends() {
        let mut source = VecChunkSource::new(vec![one_row_chunk(1), one_row_chunk(2)]);
        assert_eq!(source.next().unwrap().unwrap().columns()[0].get_raw::<i32>(0), Some(1));
        assert_eq!(source.next().unwrap().unwrap().columns()[0].get_raw::<i32>(0), Some(2));
        assert!(source.next().unwrap().is_none());
    }
}
