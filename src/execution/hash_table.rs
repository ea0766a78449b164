//! Single-threaded chained hash table shared by GroupBy, Join, and Unique.
//!
//! The ancestor's hash table partitioned buckets behind per-partition
//! `RwLock`s for a multi-threaded executor. This crate's pipeline is
//! single-threaded and cooperative, so that is collapsed to one
//! `AHashMap` keyed by a hashable row-key representation.

use ahash::AHashMap;
use ordered_float::OrderedFloat;

use crate::types::value::Value;

/// A hashable, totally-ordered stand-in for a tuple of [`Value`]s, used as
/// a hash-map key. NaN floats hash/compare equal to themselves via
/// [`OrderedFloat`], unlike `Value`'s `PartialEq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(OrderedFloat<f64>),
    Str(String),
}

pub type RowKey = Vec<KeyPart>;

pub fn value_to_key_part(v: &Value) -> KeyPart {
    match v {
        Value::Null => KeyPart::Null,
        Value::Boolean(b) => KeyPart::Bool(*b),
        Value::Int8(i) => KeyPart::Int(*i as i64),
        Value::Int16(i) => KeyPart::Int(*i as i64),
        Value::Int32(i) => KeyPart::Int(*i as i64),
        Value::Int64(i) => KeyPart::Int(*i),
        Value::UInt8(i) => KeyPart::UInt(*i as u64),
        Value::UInt16(i) => KeyPart::UInt(*i as u64),
        Value::UInt32(i) => KeyPart::UInt(*i as u64),
        Value::UInt64(i) => KeyPart::UInt(*i),
        Value::Float32(f) => KeyPart::Float(OrderedFloat(*f as f64)),
        Value::Float64(f) => KeyPart::Float(OrderedFloat(*f)),
        Value::Timestamp(t) => KeyPart::Int(*t),
        Value::Date(d) => KeyPart::Int(*d as i64),
        Value::String(s) => KeyPart::Str(s.clone()),
    }
}

pub fn row_key(values: &[Value]) -> RowKey {
    values.iter().map(value_to_key_part).collect()
}

/// True if any part of the key is `Null`. Join uses this to enforce
/// SQL-style null-key semantics: a null join key never matches anything,
/// not even another null, so such rows are excluded from both the build
/// and probe sides.
pub fn key_has_null(key: &RowKey) -> bool {
    key.iter().any(|part| matches!(part, KeyPart::Null))
}

/// Chains row indices (physical, chunk-qualified as `(chunk_idx, row_idx)`)
/// under each distinct key. Used by Join's build side and GroupBy's key
/// index.
#[derive(Debug, Default)]
pub struct RowHashTable {
    buckets: AHashMap<RowKey, Vec<(usize, usize)>>,
}

impl RowHashTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: RowKey, chunk_idx: usize, row_idx: usize) {
        self.buckets.entry(key).or_default().push((chunk_idx, row_idx));
    }

    pub fn probe(&self, key: &RowKey) -> Option<&[(usize, usize)]> {
        self.buckets.get(key).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_keys_compare_equal_to_themselves() {
        let a = row_key(&[Value::Float64(f64::NAN)]);
        let b = row_key(&[Value::Float64(f64::NAN)]);
        assert_eq!(a, b);
    }

    #[test]
    fn insert_and_probe_round_trips() {
        let mut table = RowHashTable::new();
        let key = row_key(&[Value::Int32(5)]);
        table.insert(key.clone(), 0, 3);
        table.insert(key.clone(), 0, 7);
        assert_eq!(table.probe(&key), Some(&[(0, 3), (0, 7)][..]));
    }

    #[test]
    fn missing_key_probes_to_none() {
        let table = RowHashTable::new();
        assert_eq!(table.probe(&row_key(&[Value::Int32(1)])), None);
    }
}
