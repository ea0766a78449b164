//! Compiled row-level kernels produced by [`crate::expression::compiler`].

use std::sync::Arc;

use crate::common::error::EngineResult;
use crate::types::chunk::{Chunk, SelectionVector};
use crate::types::physical_type::Kind;
use crate::types::value::Value;

/// Reads the logical row `row` (already resolved through any selection
/// vector) and produces a [`Value`]. Fallible so arithmetic kernels can
/// surface `DivisionByZero`/`Overflow` instead of swallowing them as `Null`.
pub type ValueKernel = Arc<dyn Fn(&Chunk, usize) -> EngineResult<Value> + Send + Sync>;

/// A specialized `row -> bool` predicate; null inputs evaluate to `false`
/// per SQL-style three-valued-logic-to-boolean collapse used by Filter.
pub type PredicateKernel = Arc<dyn Fn(&Chunk, usize) -> EngineResult<bool> + Send + Sync>;

/// Reads a column value out of chunk `row`, honoring the chunk's
/// selection vector and dictionary.
pub fn read_column_value(chunk: &Chunk, col_idx: usize, row: usize) -> Value {
    let physical_row = chunk.physical_row(row);
    let col = &chunk.columns()[col_idx];
    if col.is_null(physical_row) {
        return Value::Null;
    }
    match col.kind() {
        Kind::Boolean => Value::Boolean(col.get_raw::<bool>(physical_row).unwrap()),
        Kind::Int8 => Value::Int8(col.get_raw::<i8>(physical_row).unwrap()),
        Kind::Int16 => Value::Int16(col.get_raw::<i16>(physical_row).unwrap()),
        Kind::Int32 => Value::Int32(col.get_raw::<i32>(physical_row).unwrap()),
        Kind::Int64 => Value::Int64(col.get_raw::<i64>(physical_row).unwrap()),
        Kind::UInt8 => Value::UInt8(col.get_raw::<u8>(physical_row).unwrap()),
        Kind::UInt16 => Value::UInt16(col.get_raw::<u16>(physical_row).unwrap()),
        Kind::UInt32 => Value::UInt32(col.get_raw::<u32>(physical_row).unwrap()),
        Kind::UInt64 => Value::UInt64(col.get_raw::<u64>(physical_row).unwrap()),
        Kind::Float32 => Value::Float32(col.get_raw::<f32>(physical_row).unwrap()),
        Kind::Float64 => Value::Float64(col.get_raw::<f64>(physical_row).unwrap()),
        Kind::Timestamp => Value::Timestamp(col.get_raw::<i64>(physical_row).unwrap()),
        Kind::Date => Value::Date(col.get_raw::<i32>(physical_row).unwrap()),
        Kind::String => {
            let id = col.get_dict_id(physical_row).unwrap();
            Value::String(chunk.dictionary().get(id).unwrap_or("").to_string())
        }
    }
}

/// Vectorized fast path for `column <cmp> literal` filters over Float64 or
/// Int32 columns with at least 10,000 rows: builds the selection vector
/// with a tight unrolled loop over raw values instead of per-row `Value`
/// dispatch.
pub fn vectorized_numeric_filter(
    chunk: &Chunk,
    col_idx: usize,
    cmp: fn(f64, f64) -> bool,
    literal: f64,
) -> SelectionVector {
    let col = &chunk.columns()[col_idx];
    let mut out = SelectionVector::new(Vec::with_capacity(chunk.row_count()));
    for row in 0..chunk.row_count() {
        let physical_row = chunk.physical_row(row);
        if col.is_null(physical_row) {
            continue;
        }
        let value = match col.kind() {
            Kind::Int32 => col.get_raw::<i32>(physical_row).unwrap() as f64,
            Kind::Float64 => col.get_raw::<f64>(physical_row).unwrap(),
            _ => unreachable!("vectorized_numeric_filter only supports Int32/Float64"),
        };
        if cmp(value, literal) {
            out.push(physical_row);
        }
    }
    out
}

pub const VECTORIZED_FILTER_ROW_THRESHOLD: usize = 10_000;
