//! Hash join: build a `RowHashTable` over one side, probe it with the
//! other. Pipeline-breaking on the build side only; the probe side still
//! streams, chunk by chunk.

use std::sync::Arc;

use crate::common::error::EngineResult;
use crate::execution::context::ExecutionContext;
use crate::execution::hash_table::{key_has_null, row_key, RowHashTable};
use crate::execution::operator::{check_cancelled, ChunkSource};
use crate::expression::ast::Expr;
use crate::expression::compiler::compile;
use crate::expression::kernel::{read_column_value, ValueKernel};
use crate::types::chunk::Chunk;
use crate::types::column_buffer::ColumnBuffer;
use crate::types::dictionary::Dictionary;
use crate::types::physical_type::Kind;
use crate::types::schema::{ColumnDescriptor, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// Columns pulled fully into memory so the join can probe repeatedly
/// without re-draining the source.
struct MaterializedSide {
    chunks: Vec<Chunk>,
    remaps: Vec<Vec<i32>>,
    dictionary: Dictionary,
}

fn materialize_side(mut input: Box<dyn ChunkSource>, ctx: &ExecutionContext) -> EngineResult<MaterializedSide> {
    let mut chunks = Vec::new();
    let mut remaps = Vec::new();
    let mut dictionary = Dictionary::new();
    while let Some(chunk) = input.next()? {
        check_cancelled(ctx)?;
        let materialized = chunk.materialize();
        remaps.push(dictionary.merge(materialized.dictionary()));
        chunks.push(materialized);
    }
    Ok(MaterializedSide { chunks, remaps, dictionary })
}

/// Builds a hash table over the right side, then streams the left side
/// through, probing each row and emitting matched (or, for `Left`,
/// unmatched-with-nulls) combined rows.
pub struct JoinOperator {
    left: Option<Box<dyn ChunkSource>>,
    right: Option<Box<dyn ChunkSource>>,
    left_keys: Vec<Arc<Expr>>,
    right_keys: Vec<Arc<Expr>>,
    kind: JoinKind,
    left_schema: Arc<Schema>,
    right_schema: Arc<Schema>,
    output_schema: Arc<Schema>,
    excluded_right: std::collections::HashSet<usize>,
    ctx: ExecutionContext,
    output: Option<std::vec::IntoIter<Chunk>>,
}

/// Right-side column indices that duplicate a right join key and are
/// therefore dropped from the output (spec: "right columns in order
/// excluding the duplicate join keys"). Only bare `Expr::Column` keys can
/// duplicate an output column; computed keys never do.
fn right_key_column_indices(right: &Schema, right_keys: &[Arc<Expr>]) -> std::collections::HashSet<usize> {
    right_keys
        .iter()
        .filter_map(|e| match e.as_ref() {
            Expr::Column(name) => right.index_of(name),
            _ => None,
        })
        .collect()
}

/// Appends `_x`/`_y` to either side's column name when both schemas share
/// a name, leaving unambiguous names untouched. Right-side columns that
/// duplicate a right join key are excluded entirely.
fn build_output_schema(left: &Schema, right: &Schema, excluded_right: &std::collections::HashSet<usize>) -> EngineResult<Schema> {
    let mut descriptors = Vec::with_capacity(left.len() + right.len());
    for col in left.columns() {
        let name = if right.index_of(&col.name).is_some() { format!("{}_x", col.name) } else { col.name.to_string() };
        descriptors.push(ColumnDescriptor::new(name, col.dtype));
    }
    for (idx, col) in right.columns().iter().enumerate() {
        if excluded_right.contains(&idx) {
            continue;
        }
        let name = if left.index_of(&col.name).is_some() { format!("{}_y", col.name) } else { col.name.to_string() };
        // Left join can fill this column with nulls for an unmatched left
        // row, so widen it regardless of the source schema's nullability.
        descriptors.push(ColumnDescriptor::new(name, crate::types::dtype::DType::new(col.dtype.kind, true)));
    }
    Schema::new(descriptors)
}

impl JoinOperator {
    pub fn new(
        left: Box<dyn ChunkSource>,
        right: Box<dyn ChunkSource>,
        left_keys: Vec<Arc<Expr>>,
        right_keys: Vec<Arc<Expr>>,
        kind: JoinKind,
        left_schema: Arc<Schema>,
        right_schema: Arc<Schema>,
        ctx: ExecutionContext,
    ) -> EngineResult<Self> {
        let excluded_right = right_key_column_indices(&right_schema, &right_keys);
        let output_schema = Arc::new(build_output_schema(&left_schema, &right_schema, &excluded_right)?);
        Ok(Self {
            left: Some(left),
            right: Some(right),
            left_keys,
            right_keys,
            kind,
            left_schema,
            right_schema,
            output_schema,
            excluded_right,
            ctx,
            output: None,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }

    fn run(&mut self) -> EngineResult<()> {
        let left_source = self.left.take().expect("run called twice");
        let right_source = self.right.take().expect("run called twice");

        let left_side = materialize_side(left_source, &self.ctx)?;
        let right_side = materialize_side(right_source, &self.ctx)?;

        let left_kernels: Vec<ValueKernel> =
            self.left_keys.iter().map(|e| compile(e, &self.left_schema).map(|(_, k)| k)).collect::<EngineResult<_>>()?;
        let right_kernels: Vec<ValueKernel> =
            self.right_keys.iter().map(|e| compile(e, &self.right_schema).map(|(_, k)| k)).collect::<EngineResult<_>>()?;

        let mut table = RowHashTable::new();
        for (ci, chunk) in right_side.chunks.iter().enumerate() {
            for row in 0..chunk.row_count() {
                let key_values: Vec<_> = right_kernels.iter().map(|k| k(chunk, row)).collect::<EngineResult<_>>()?;
                let key = row_key(&key_values);
                // a null join key never matches anything (SQL semantics);
                // skip it on the build side so it can never be probed into.
                if key_has_null(&key) {
                    continue;
                }
                table.insert(key, ci, row);
            }
        }

        let mut dictionary = left_side.dictionary.clone();
        let right_to_merged = dictionary.merge(&right_side.dictionary);

        let left_width = self.left_schema.len();
        // right-side column indices kept in the output, in schema order
        let right_output_cols: Vec<usize> = (0..self.right_schema.len()).filter(|i| !self.excluded_right.contains(i)).collect();

        let mut out_rows: Vec<(Option<(usize, usize)>, Option<(usize, usize)>)> = Vec::new();

        for (lci, lchunk) in left_side.chunks.iter().enumerate() {
            check_cancelled(&self.ctx)?;
            for lrow in 0..lchunk.row_count() {
                let key_values: Vec<_> = left_kernels.iter().map(|k| k(lchunk, lrow)).collect::<EngineResult<_>>()?;
                let key = row_key(&key_values);
                // a null probe key can never match a (null-free) build-side
                // key; treat it the same as a miss.
                let probed = if key_has_null(&key) { None } else { table.probe(&key) };
                match probed {
                    Some(matches) if !matches.is_empty() => {
                        for &(rci, rrow) in matches {
                            out_rows.push((Some((lci, lrow)), Some((rci, rrow))));
                        }
                    }
                    _ => {
                        if self.kind == JoinKind::Left {
                            out_rows.push((Some((lci, lrow)), None));
                        }
                    }
                }
            }
        }

        let mut columns: Vec<ColumnBuffer> = self
            .output_schema
            .columns()
            .iter()
            .map(|d| ColumnBuffer::with_capacity(d.dtype.kind, d.dtype.nullable, out_rows.len()))
            .collect();

        for (left_ref, right_ref) in &out_rows {
            for col_idx in 0..left_width {
                let descriptor = self.left_schema.column(col_idx).unwrap();
                match left_ref {
                    Some((ci, ri)) => {
                        if descriptor.dtype.kind == Kind::String {
                            let id = left_side.chunks[*ci].columns()[col_idx]
                                .get_dict_id(*ri)
                                .map(|old| left_side.remaps[*ci][old as usize]);
                            columns[col_idx].push_dict_id(id)?;
                        } else {
                            let value = read_column_value(&left_side.chunks[*ci], col_idx, *ri);
                            columns[col_idx].push(&value)?;
                        }
                    }
                    None => columns[col_idx].push(&crate::types::value::Value::Null)?,
                }
            }
            for (out_offset, &col_idx) in right_output_cols.iter().enumerate() {
                let descriptor = self.right_schema.column(col_idx).unwrap();
                let out_idx = left_width + out_offset;
                match right_ref {
                    Some((ci, ri)) => {
                        if descriptor.dtype.kind == Kind::String {
                            let id = right_side.chunks[*ci].columns()[col_idx]
                                .get_dict_id(*ri)
                                .map(|old| right_to_merged[right_side.remaps[*ci][old as usize] as usize]);
                            columns[out_idx].push_dict_id(id)?;
                        } else {
                            let value = read_column_value(&right_side.chunks[*ci], col_idx, *ri);
                            columns[out_idx].push(&value)?;
                        }
                    }
                    None => columns[out_idx].push(&crate::types::value::Value::Null)?,
                }
            }
        }

        let chunk = Chunk::new(self.output_schema.clone(), columns, dictionary)?;
        self.output = Some(vec![chunk].into_iter());
        Ok(())
    }
}

impl ChunkSource for JoinOperator {
    fn next(&mut self) -> EngineResult<Option<Chunk>> {
        check_cancelled(&self.ctx)?;
        if self.output.is_none() {
            self.run()?;
        }
        Ok(self.output.as_mut().unwrap().next())
    }
}
