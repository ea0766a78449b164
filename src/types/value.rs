//! Scalar values, used at expression-evaluation boundaries and by the
//! sort/aggregate/join kernels that compare row values directly.

use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::fmt;

use crate::types::physical_type::Kind;

/// A single scalar value with its null state folded in (`Null` is its own
/// variant rather than `Option<Value>` so a `Value` always carries which
/// kind it would be if present).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Timestamp(i64),
    Date(i32),
    String(String),
}

impl Value {
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(Kind::Boolean),
            Value::Int8(_) => Some(Kind::Int8),
            Value::Int16(_) => Some(Kind::Int16),
            Value::Int32(_) => Some(Kind::Int32),
            Value::Int64(_) => Some(Kind::Int64),
            Value::UInt8(_) => Some(Kind::UInt8),
            Value::UInt16(_) => Some(Kind::UInt16),
            Value::UInt32(_) => Some(Kind::UInt32),
            Value::UInt64(_) => Some(Kind::UInt64),
            Value::Float32(_) => Some(Kind::Float32),
            Value::Float64(_) => Some(Kind::Float64),
            Value::Timestamp(_) => Some(Kind::Timestamp),
            Value::Date(_) => Some(Kind::Date),
            Value::String(_) => Some(Kind::String),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int8(v) => Some(v as f64),
            Value::Int16(v) => Some(v as f64),
            Value::Int32(v) => Some(v as f64),
            Value::Int64(v) => Some(v as f64),
            Value::UInt8(v) => Some(v as f64),
            Value::UInt16(v) => Some(v as f64),
            Value::UInt32(v) => Some(v as f64),
            Value::UInt64(v) => Some(v as f64),
            Value::Float32(v) => Some(v as f64),
            Value::Float64(v) => Some(v),
            _ => None,
        }
    }

    /// Widens to `i64` for integral kinds only; `None` for floats and
    /// non-numeric values (arithmetic falls back to `as_f64` for those).
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int8(v) => Some(v as i64),
            Value::Int16(v) => Some(v as i64),
            Value::Int32(v) => Some(v as i64),
            Value::Int64(v) => Some(v),
            Value::UInt8(v) => Some(v as i64),
            Value::UInt16(v) => Some(v as i64),
            Value::UInt32(v) => Some(v as i64),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
        }
    }
}

/// Nulls-last total ordering, used by the Sort operator's multi-key
/// comparator and by GroupBy/Unique hash keys. Floating point NaN sorts
/// after every other float via [`OrderedFloat`]'s total order.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Int8(a), Value::Int8(b)) => a.cmp(b),
            (Value::Int16(a), Value::Int16(b)) => a.cmp(b),
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::UInt8(a), Value::UInt8(b)) => a.cmp(b),
            (Value::UInt16(a), Value::UInt16(b)) => a.cmp(b),
            (Value::UInt32(a), Value::UInt32(b)) => a.cmp(b),
            (Value::UInt64(a), Value::UInt64(b)) => a.cmp(b),
            (Value::Float32(a), Value::Float32(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            (Value::Float64(a), Value::Float64(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_last() {
        assert_eq!(Value::Null.partial_cmp(&Value::Int32(5)), Some(Ordering::Greater));
        assert_eq!(Value::Int32(5).partial_cmp(&Value::Null), Some(Ordering::Less));
    }

    #[test]
    fn nan_sorts_after_every_float() {
        let nan = Value::Float64(f64::NAN);
        let one = Value::Float64(1.0);
        assert_eq!(one.partial_cmp(&nan), Some(Ordering::Less));
    }

    #[test]
    fn mismatched_kinds_incomparable() {
        assert_eq!(Value::Int32(1).partial_cmp(&Value::String("1".into())), None);
    }
}
