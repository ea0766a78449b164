//! Nullable type descriptor used throughout schemas and expressions.

use std::fmt;

use crate::types::physical_type::Kind;

/// A [`Kind`] paired with nullability. Two columns of the same `Kind` but
/// different nullability are distinct types for schema-equality purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DType {
    pub kind: Kind,
    pub nullable: bool,
}

impl DType {
    pub fn new(kind: Kind, nullable: bool) -> Self {
        Self { kind, nullable }
    }

    pub fn not_null(kind: Kind) -> Self {
        Self::new(kind, false)
    }

    pub fn nullable(kind: Kind) -> Self {
        Self::new(kind, true)
    }

    /// Widest type two operands promote to for arithmetic/comparison, or
    /// `None` if they can't be reconciled. Numeric promotion favors floating
    /// point over integral and wider width over narrower.
    pub fn promote(a: Kind, b: Kind) -> Option<Kind> {
        if a == b {
            return Some(a);
        }
        if !a.is_numeric() || !b.is_numeric() {
            return None;
        }
        if a.is_floating_point() || b.is_floating_point() {
            return Some(Kind::Float64);
        }
        Some(if a.element_width() >= b.element_width() { a } else { b })
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}?", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}
