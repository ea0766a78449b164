//! A memory-mapped CSV [`ChunkSource`], for files too large to read
//! eagerly into a heap buffer. Feeds the tokenizer in fixed-size slices of
//! the mapped region rather than handing it the whole file at once, so a
//! long file still produces its first chunks promptly.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;

use crate::common::config::ParseConfig;
use crate::common::error::EngineResult;
use crate::csv::tokenizer::CsvTokenizer;
use crate::execution::operator::ChunkSource;
use crate::types::chunk::Chunk;
use crate::types::schema::Schema;

const FEED_WINDOW_BYTES: usize = 1 << 20;

pub struct MmapCsvSource {
    mmap: Mmap,
    offset: usize,
    tokenizer: CsvTokenizer,
    pending: VecDeque<Chunk>,
    finished: bool,
}

impl MmapCsvSource {
    pub fn open(path: &Path, schema: Arc<Schema>, options: ParseConfig) -> EngineResult<Self> {
        let file = std::fs::File::open(path)?;
        // Safety: the mapped file must not be mutated by another process for
        // the lifetime of this mapping; the engine treats CSV inputs as
        // read-only snapshots.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap, offset: 0, tokenizer: CsvTokenizer::new(schema, options), pending: VecDeque::new(), finished: false })
    }
}

impl ChunkSource for MmapCsvSource {
    fn next(&mut self) -> EngineResult<Option<Chunk>> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Ok(Some(chunk));
            }
            if self.finished {
                return Ok(None);
            }
            if self.offset >= self.mmap.len() {
                self.finished = true;
                return self.tokenizer.finish();
            }
            let end = (self.offset + FEED_WINDOW_BYTES).min(self.mmap.len());
            let produced = self.tokenizer.feed(&self.mmap[self.offset..end])?;
            self.offset = end;
            self.pending.extend(produced);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dtype::DType;
    use crate::types::physical_type::Kind;
    use crate::types::schema::ColumnDescriptor;
    use std::io::Write;

    #[test]
    fn reads_a_small_csv_file_end_to_end() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,name").unwrap();
        for i in 0..5 {
            writeln!(file, "{i},row{i}").unwrap();
        }
        let schema = Arc::new(
            Schema::new(vec![
                ColumnDescriptor::new("id", DType::not_null(Kind::Int32)),
                ColumnDescriptor::new("name", DType::not_null(Kind::String)),
            ])
            .unwrap(),
        );
        let mut source = MmapCsvSource::open(file.path(), schema, ParseConfig::default()).unwrap();
        let mut total = 0;
        while let Some(chunk) = source.next().unwrap() {
            total += chunk.row_count();
        }
        assert_eq!(total, 5);
    }
}
