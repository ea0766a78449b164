//! Drives a composed chain of [`ChunkSource`] operators to completion,
//! either materializing every chunk or streaming them one at a time.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info_span};

use crate::common::error::{EngineError, EngineResult};
use crate::execution::context::ExecutionContext;
use crate::execution::operator::ChunkSource;
use crate::types::chunk::Chunk;
use crate::types::schema::Schema;

/// The materialized result of [`Pipeline::execute`]: every output chunk
/// plus the schema they share.
pub struct PipelineResult {
    pub schema: Arc<Schema>,
    pub chunks: Vec<Chunk>,
}

impl PipelineResult {
    pub fn row_count(&self) -> usize {
        self.chunks.iter().map(|c| c.row_count()).sum()
    }
}

/// Wraps the already-composed operator chain (the final operator, itself
/// a `ChunkSource` over everything upstream of it) with the schema it
/// produces and the context its operators share.
pub struct Pipeline {
    source: Box<dyn ChunkSource>,
    output_schema: Arc<Schema>,
    ctx: ExecutionContext,
}

impl Pipeline {
    pub fn new(source: Box<dyn ChunkSource>, output_schema: Arc<Schema>, ctx: ExecutionContext) -> Self {
        Self { source, output_schema, ctx }
    }

    /// Drains the pipeline on the current thread, collecting every chunk.
    pub fn execute(mut self) -> EngineResult<PipelineResult> {
        let span = info_span!("pipeline.execute");
        let _enter = span.enter();
        let mut chunks = Vec::new();
        loop {
            if self.ctx.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            match self.source.next()? {
                Some(chunk) => chunks.push(chunk),
                None => break,
            }
        }
        let row_count: usize = chunks.iter().map(|c| c.row_count()).sum();
        debug!(chunk_count = chunks.len(), row_count, "pipeline.execute finished");
        Ok(PipelineResult { schema: self.output_schema, chunks })
    }

    /// Drains the pipeline on a blocking worker thread, sending each chunk
    /// over a channel as soon as it's ready so the caller can consume the
    /// pipeline as an async stream. Yields control only at chunk
    /// boundaries; no suspension happens mid-operator.
    pub fn execute_async(self) -> mpsc::Receiver<EngineResult<Chunk>> {
        let (tx, rx) = mpsc::channel(4);
        let span = info_span!("pipeline.execute_async");
        tokio::task::spawn_blocking(move || {
            let _enter = span.enter();
            let Pipeline { mut source, output_schema: _, ctx } = self;
            let mut produced = 0usize;
            loop {
                if ctx.is_cancelled() {
                    let _ = tx.blocking_send(Err(EngineError::Cancelled));
                    break;
                }
                match source.next() {
                    Ok(Some(chunk)) => {
                        produced += 1;
                        if tx.blocking_send(Ok(chunk)).is_err() {
                            break; // receiver dropped
                        }
                    }
                    Ok(None) => {
                        debug!(chunk_count = produced, "pipeline.execute_async finished");
                        break;
                    }
                    Err(err) => {
                        let _ = tx.blocking_send(Err(err));
                        break;
                    }
                }
            }
        });
        rx
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.output_schema
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
    use crate::types::schema::ColumnDescriptor;
    use crate::types::value::Value;

    fn one_row_chunk(schema: &Arc<Schema>, v: i32) -> Chunk {
        let mut col = ColumnBuffer::with_capacity(Kind::Int32, false, 1);
        col.push(&Value::Int32(v)).unwrap();
        Chunk::new(schema.clone(), vec![col], Dictionary::new()).unwrap()
    }

    #[test]
    fn execute_materializes_all_chunks() {
        let schema = Arc::new(Schema::new(vec![ColumnDescriptor::new("a", DType::not_null(Kind::Int32))]).unwrap());
        let source = VecChunkSource::new(vec![one_row_chunk(&schema, 1), one_row_chunk(&schema, 2)]);
        let pipeline = Pipeline::new(Box::new(source), schema.clone(), ExecutionContext::unbounded());
        let result = pipeline.execute().unwrap();
        assert_eq!(result.chunks.len(), 2);
        assert_eq!(result.row_count(), 2);
    }

    #[test]
    fn execute_respects_cancellation() {
        let schema = Arc::new(Schema::new(vec![ColumnDescriptor::new("a", DType::not_null(Kind::Int32))]).unwrap());
        let source = VecChunkSource::new(vec![one_row_chunk(&schema, 1)]);
        let ctx = ExecutionContext::unbounded();
        ctx.cancellation.cancel();
        let pipeline = Pipeline::new(Box::new(source), schema, ctx);
        assert!(matches!(pipeline.execute(), Err(EngineError::Cancelled)));
    }

    #[tokio::test]
    async fn execute_async_streams_chunks_over_a_channel() {
        let schema = Arc::new(Schema::new(vec![ColumnDescriptor::new("a", DType::not_null(Kind::Int32))]).unwrap());
        let source = VecChunkSource::new(vec![one_row_chunk(&schema, 1), one_row_chunk(&schema, 2)]);
        let pipeline = Pipeline::new(Box::new(source), schema, ExecutionContext::unbounded());
        let mut rx = pipeline.execute_async();
        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.columns()[0].get_raw::<i32>(0), Some(1));
        let second = rx.recv().await.unwrap().unwrap();
        assert_eq!(second.columns()[0].get_raw::<i32>(0), Some(2));
        assert!(rx.recv().await.is_none());
    }
}
