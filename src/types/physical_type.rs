//! Physical storage kind for a column.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The physical representation backing a [`crate::types::column_buffer::ColumnBuffer`].
/// Fixed-width kinds store their values inline; `String` stores a 4-byte
/// dictionary id per row and defers to the chunk's shared dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Microseconds since the Unix epoch.
    Timestamp,
    /// Days since the Unix epoch.
    Date,
    /// Dictionary-encoded variable length text.
    String,
}

impl Kind {
    /// Width in bytes of one stored element. For `String` this is the width
    /// of the dictionary id, not the referenced text.
    pub fn element_width(self) -> usize {
        match self {
            Kind::Boolean | Kind::Int8 | Kind::UInt8 => 1,
            Kind::Int16 | Kind::UInt16 => 2,
            Kind::Int32 | Kind::UInt32 | Kind::Float32 | Kind::Date | Kind::String => 4,
            Kind::Int64 | Kind::UInt64 | Kind::Float64 | Kind::Timestamp => 8,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Kind::Int8
                | Kind::Int16
                | Kind::Int32
                | Kind::Int64
                | Kind::UInt8
                | Kind::UInt16
                | Kind::UInt32
                | Kind::UInt64
                | Kind::Float32
                | Kind::Float64
        )
    }

    pub fn is_integral(self) -> bool {
        self.is_numeric() && !matches!(self, Kind::Float32 | Kind::Float64)
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, Kind::Float32 | Kind::Float64)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, Kind::Timestamp | Kind::Date)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Boolean => "BOOLEAN",
            Kind::Int8 => "INT8",
            Kind::Int16 => "INT16",
            Kind::Int32 => "INT32",
            Kind::Int64 => "INT64",
            Kind::UInt8 => "UINT8",
            Kind::UInt16 => "UINT16",
            Kind::UInt32 => "UINT32",
            Kind::UInt64 => "UINT64",
            Kind::Float32 => "FLOAT32",
            Kind::Float64 => "FLOAT64",
            Kind::Timestamp => "TIMESTAMP",
            Kind::Date => "DATE",
            Kind::String => "STRING",
        };
        write!(f, "{name}")
    }
}
