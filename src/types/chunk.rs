//! A row-aligned group of columns, the unit operators pass between each
//! other.

use std::sync::Arc;

use crate::common::error::{EngineError, EngineResult};
use crate::types::column_buffer::ColumnBuffer;
use crate::types::dictionary::Dictionary;
use crate::types::schema::Schema;

/// An ordered list of row indices into a chunk's buffers, used to represent
/// a filtered view without copying column data. `Filter` produces one;
/// most downstream operators materialize it away before doing further work.
#[derive(Debug, Clone)]
pub struct SelectionVector {
    indices: Vec<usize>,
}

impl SelectionVector {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn sequential(len: usize) -> Self {
        Self { indices: (0..len).collect() }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn push(&mut self, idx: usize) {
        self.indices.push(idx);
    }
}

/// A batch of rows: one [`ColumnBuffer`] per schema column, an optional
/// shared string [`Dictionary`], and an optional [`SelectionVector`]
/// narrowing which rows are logically present.
#[derive(Debug, Clone)]
pub struct Chunk {
    schema: Arc<Schema>,
    columns: Vec<ColumnBuffer>,
    dictionary: Dictionary,
    selection: Option<SelectionVector>,
}

impl Chunk {
    pub fn new(schema: Arc<Schema>, columns: Vec<ColumnBuffer>, dictionary: Dictionary) -> EngineResult<Self> {
        if columns.len() != schema.len() {
            return Err(EngineError::SchemaMismatch {
                expected: format!("{} columns", schema.len()),
                found: format!("{} columns", columns.len()),
            });
        }
        let row_count = columns.first().map(|c| c.len()).unwrap_or(0);
        for col in &columns {
            if col.len() != row_count {
                return Err(EngineError::SchemaMismatch {
                    expected: format!("{row_count} rows"),
                    found: format!("{} rows", col.len()),
                });
            }
        }
        Ok(Self { schema, columns, dictionary, selection: None })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn columns(&self) -> &[ColumnBuffer] {
        &self.columns
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    pub fn selection(&self) -> Option<&SelectionVector> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<SelectionVector>) {
        self.selection = selection;
    }

    /// Logical row count: the selection length if one is set, else the
    /// buffer length.
    pub fn row_count(&self) -> usize {
        match &self.selection {
            Some(sel) => sel.len(),
            None => self.columns.first().map(|c| c.len()).unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// The physical row index for logical row `i`, applying any selection.
    pub fn physical_row(&self, i: usize) -> usize {
        match &self.selection {
            Some(sel) => sel.as_slice()[i],
            None => i,
        }
    }

    /// Materialize the selection vector away, copying only the selected
    /// rows into fresh column buffers. After this, `selection()` is `None`.
    pub fn materialize(&self) -> Chunk {
        match &self.selection {
            None => self.clone(),
            Some(sel) => {
                let columns = self.columns.iter().map(|c| c.copy_selected(sel.as_slice())).collect();
                Chunk {
                    schema: self.schema.clone(),
                    columns,
                    dictionary: self.dictionary.clone(),
                    selection: None,
                }
            }
        }
    }

    /// Invariant check used by tests: column count matches schema, all
    /// columns have equal physical length, and any selection indices are
    /// in bounds.
    pub fn verify(&self) -> EngineResult<()> {
        if self.columns.len() != self.schema.len() {
            return Err(EngineError::SchemaMismatch {
                expected: format!("{} columns", self.schema.len()),
                found: format!("{} columns", self.columns.len()),
            });
        }
        let physical_len = self.columns.first().map(|c| c.len()).unwrap_or(0);
        for col in &self.columns {
            if col.len() != physical_len {
                return Err(EngineError::SchemaMismatch {
                    expected: format!("{physical_len} rows"),
                    found: format!("{} rows", col.len()),
                });
            }
        }
        if let Some(sel) = &self.selection {
            for &idx in sel.as_slice() {
                if idx >= physical_len {
                    return Err(EngineError::InvalidArgument {
                        message: format!("selection index {idx} out of bounds ({physical_len} rows)"),
                    });
                }
            }
        }
        Ok(())
    }
}
