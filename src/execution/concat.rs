//! Concatenates rows from multiple sources sharing the same set of
//! columns into a single stream, merging each source's dictionary as it
//! is consumed.

use std::sync::Arc;

use crate::common::error::{EngineError, EngineResult};
use crate::execution::context::ExecutionContext;
use crate::execution::operator::{check_cancelled, ChunkSource};
use crate::types::chunk::Chunk;
use crate::types::column_buffer::ColumnBuffer;
use crate::types::dictionary::Dictionary;
use crate::types::physical_type::Kind;
use crate::types::schema::Schema;

pub struct ConcatOperator {
    sources: Vec<Box<dyn ChunkSource>>,
    current: usize,
    schema: Arc<Schema>,
    dictionary: Dictionary,
    ctx: ExecutionContext,
}

impl ConcatOperator {
    pub fn new(sources: Vec<Box<dyn ChunkSource>>, schema: Schema, ctx: ExecutionContext) -> Self {
        Self { sources, current: 0, schema: Arc::new(schema), dictionary: Dictionary::new(), ctx }
    }

    /// Reorders `chunk`'s columns to `self.schema`'s declaration order (the
    /// first source's order) and, for `String` columns, remaps dictionary
    /// ids into the operator's running merged dictionary. Chunks whose
    /// source already matches that order and carry no `String` column are
    /// passed through untouched.
    fn rebuild(&mut self, chunk: Chunk) -> EngineResult<Chunk> {
        let already_ordered =
            chunk.schema().columns().iter().map(|c| &c.name).eq(self.schema.columns().iter().map(|c| &c.name));
        let has_strings = self.schema.columns().iter().any(|c| c.dtype.kind == Kind::String);
        if already_ordered && !has_strings {
            return Ok(chunk);
        }

        let materialized = chunk.materialize();
        let remap = self.dictionary.merge(materialized.dictionary());
        let row_count = materialized.row_count();
        let mut columns = Vec::with_capacity(self.schema.len());
        for descriptor in self.schema.columns() {
            let src_idx = materialized.schema().index_of(&descriptor.name).ok_or_else(|| EngineError::SchemaMismatch {
                expected: format!("column '{}'", descriptor.name),
                found: format!("{:?}", materialized.schema().columns()),
            })?;
            let src_col = &materialized.columns()[src_idx];
            if descriptor.dtype.kind == Kind::String {
                let mut col = ColumnBuffer::with_capacity(Kind::String, descriptor.dtype.nullable, row_count);
                for row in 0..row_count {
                    let id = src_col.get_dict_id(row).map(|old| remap[old as usize]);
                    col.push_dict_id(id)?;
                }
                columns.push(col);
            } else {
                columns.push(src_col.copy_selected(&(0..row_count).collect::<Vec<_>>()));
            }
        }
        Chunk::new(self.schema.clone(), columns, self.dictionary.clone())
    }
}

/// Order-insensitive column comparison: the same columns (name and type)
/// must be present, but `other`'s declaration order need not match
/// `schema`'s. Output order always follows `schema` (the first source's).
fn columns_match_as_set(schema: &Schema, other: &Schema) -> bool {
    if schema.len() != other.len() {
        return false;
    }
    schema.columns().iter().all(|col| other.column_by_name(&col.name).map(|oc| oc.dtype == col.dtype).unwrap_or(false))
}

impl ChunkSource for ConcatOperator {
    fn next(&mut self) -> EngineResult<Option<Chunk>> {
        check_cancelled(&self.ctx)?;
        while self.current < self.sources.len() {
            match self.sources[self.current].next()? {
                Some(chunk) => {
                    if !columns_match_as_set(&self.schema, chunk.schema()) {
                        return Err(EngineError::SchemaMismatch {
                            expected: format!("{:?}", self.schema.columns()),
                            found: format!("{:?}", chunk.schema().columns()),
                        });
                    }
                    return Ok(Some(self.rebuild(chunk)?));
                }
                None => self.current += 1,
            }
        }
        Ok(None)
    }
}
