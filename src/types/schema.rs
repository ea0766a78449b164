//! Ordered column descriptors plus a name lookup index.

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::error::{EngineError, EngineResult};
use crate::types::dtype::DType;

/// A single column's name and type within a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: Arc<str>,
    pub dtype: DType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<Arc<str>>, dtype: DType) -> Self {
        Self { name: name.into(), dtype }
    }
}

/// An ordered, name-indexed list of columns. Column order is part of a
/// schema's identity: two schemas with the same columns in different order
/// are unequal.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
    index: HashMap<Arc<str>, usize>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> EngineResult<Self> {
        let mut seen_lower: HashMap<String, ()> = HashMap::with_capacity(columns.len());
        let mut exact_index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            let lower = col.name.to_lowercase();
            if seen_lower.insert(lower, ()).is_some() {
                return Err(EngineError::InvalidArgument {
                    message: format!("duplicate column name '{}' (case-insensitive)", col.name),
                });
            }
            exact_index.insert(col.name.clone(), i);
        }
        Ok(Self { columns, index: exact_index })
    }

    pub fn empty() -> Self {
        Self { columns: Vec::new(), index: HashMap::new() }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Case-sensitive lookup by exact name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn column(&self, idx: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(idx)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.index_of(name).map(|i| &self.columns[i])
    }

    /// Build a new schema retaining only the named columns, in the order
    /// given (used by projection / projection pushdown).
    pub fn project(&self, names: &[String]) -> EngineResult<Self> {
        let mut cols = Vec::with_capacity(names.len());
        for name in names {
            let col = self.column_by_name(name).ok_or_else(|| EngineError::InvalidArgument {
                message: format!("unknown column '{name}'"),
            })?;
            cols.push(col.clone());
        }
        Schema::new(cols)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}
impl Eq for Schema {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::physical_type::Kind;

    fn col(name: &str, kind: Kind) -> ColumnDescriptor {
        ColumnDescriptor::new(name, DType::not_null(kind))
    }

    #[test]
    fn rejects_case_insensitive_duplicates() {
        let err = Schema::new(vec![col("id", Kind::Int32), col("ID", Kind::Int32)]);
        assert!(err.is_err());
    }

    #[test]
    fn order_is_part_of_identity() {
        let a = Schema::new(vec![col("a", Kind::Int32), col("b", Kind::Int32)]).unwrap();
        let b = Schema::new(vec![col("b", Kind::Int32), col("a", Kind::Int32)]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let s = Schema::new(vec![col("Id", Kind::Int32)]).unwrap();
        assert_eq!(s.index_of("Id"), Some(0));
        assert_eq!(s.index_of("id"), None);
    }

    #[test]
    fn project_reorders_and_subsets() {
        let s = Schema::new(vec![col("a", Kind::Int32), col("b", Kind::Int32), col("c", Kind::Int32)]).unwrap();
        let p = s.project(&["c".to_string(), "a".to_string()]).unwrap();
        assert_eq!(p.columns()[0].name.as_ref(), "c");
        assert_eq!(p.columns()[1].name.as_ref(), "a");
    }
}
