//! Per-kind byte-level decoders operating directly on field slices, no
//! intermediate `String` allocation on the hot path.

use crate::common::error::{EngineError, EngineResult};
use crate::types::physical_type::Kind;
use crate::types::value::Value;

/// True if `field` matches the configured null-literal set exactly.
pub fn is_null_literal(field: &[u8], null_literals: &std::collections::HashSet<String>) -> bool {
    match std::str::from_utf8(field) {
        Ok(s) => null_literals.contains(s),
        Err(_) => false,
    }
}

/// `1/T/t/Y/y` decode to `true`; everything else (including `0/F/f/N/n`) to
/// `false`.
pub fn decode_bool(field: &[u8]) -> bool {
    matches!(field, b"1" | b"T" | b"t" | b"Y" | b"y" | b"true" | b"True" | b"TRUE")
}

fn field_str<'a>(field: &'a [u8], column: &str, row: usize) -> EngineResult<&'a str> {
    std::str::from_utf8(field).map_err(|_| EngineError::InvalidInteger {
        column: column.to_string(),
        row,
        text: String::from_utf8_lossy(field).into_owned(),
    })
}

/// Parses a signed integer field, inlined for narrow widths and falling
/// back to a string parse for 64-bit kinds (`BigInt` in the original
/// terminology).
pub fn decode_int(field: &[u8], column: &str, row: usize) -> EngineResult<i64> {
    let s = field_str(field, column, row)?;
    s.parse::<i64>().map_err(|_| EngineError::InvalidInteger { column: column.to_string(), row, text: s.to_string() })
}

pub fn decode_uint(field: &[u8], column: &str, row: usize) -> EngineResult<u64> {
    let s = field_str(field, column, row)?;
    s.parse::<u64>().map_err(|_| EngineError::InvalidInteger { column: column.to_string(), row, text: s.to_string() })
}

pub fn decode_float(field: &[u8], column: &str, row: usize) -> EngineResult<f64> {
    let s = std::str::from_utf8(field).map_err(|_| EngineError::InvalidFloat {
        column: column.to_string(),
        row,
        text: String::from_utf8_lossy(field).into_owned(),
    })?;
    s.parse::<f64>().map_err(|_| EngineError::InvalidFloat { column: column.to_string(), row, text: s.to_string() })
}

/// The zero default used for a non-nullable column fed an empty field.
pub fn zero_default(kind: Kind) -> Value {
    match kind {
        Kind::Boolean => Value::Boolean(false),
        Kind::Int8 => Value::Int8(0),
        Kind::Int16 => Value::Int16(0),
        Kind::Int32 => Value::Int32(0),
        Kind::Int64 => Value::Int64(0),
        Kind::UInt8 => Value::UInt8(0),
        Kind::UInt16 => Value::UInt16(0),
        Kind::UInt32 => Value::UInt32(0),
        Kind::UInt64 => Value::UInt64(0),
        Kind::Float32 => Value::Float32(0.0),
        Kind::Float64 => Value::Float64(0.0),
        Kind::Timestamp => Value::Timestamp(0),
        Kind::Date => Value::Date(0),
        Kind::String => Value::String(String::new()),
    }
}

/// Decodes a raw field slice into a typed [`Value`] per `kind`. Does not
/// handle nulls or dictionary interning; callers check those first.
pub fn decode_field(field: &[u8], kind: Kind, column: &str, row: usize) -> EngineResult<Value> {
    Ok(match kind {
        Kind::Boolean => Value::Boolean(decode_bool(field)),
        Kind::Int8 => Value::Int8(decode_int(field, column, row)? as i8),
        Kind::Int16 => Value::Int16(decode_int(field, column, row)? as i16),
        Kind::Int32 => Value::Int32(decode_int(field, column, row)? as i32),
        Kind::Int64 => Value::Int64(decode_int(field, column, row)?),
        Kind::UInt8 => Value::UInt8(decode_uint(field, column, row)? as u8),
        Kind::UInt16 => Value::UInt16(decode_uint(field, column, row)? as u16),
        Kind::UInt32 => Value::UInt32(decode_uint(field, column, row)? as u32),
        Kind::UInt64 => Value::UInt64(decode_uint(field, column, row)?),
        Kind::Float32 => Value::Float32(decode_float(field, column, row)? as f32),
        Kind::Float64 => Value::Float64(decode_float(field, column, row)?),
        Kind::Timestamp => Value::Timestamp(decode_int(field, column, row)?),
        Kind::Date => Value::Date(decode_int(field, column, row)? as i32),
        Kind::String => Value::String(field_str(field, column, row)?.to_string()),
    })
}
