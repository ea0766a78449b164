//! Error taxonomy for the execution kernel.

use thiserror::Error;

/// Errors raised anywhere in the engine: type checking, compilation,
/// execution, or CSV parsing. Every variant carries the context an operator
/// had on hand when the failure occurred, not just a message.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },

    #[error("type mismatch in column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("invalid integer in column '{column}' at row {row}: {text:?}")]
    InvalidInteger {
        column: String,
        row: usize,
        text: String,
    },

    #[error("invalid float in column '{column}' at row {row}: {text:?}")]
    InvalidFloat {
        column: String,
        row: usize,
        text: String,
    },

    #[error("unclosed quote starting at byte offset {byte_offset}")]
    UnclosedQuote { byte_offset: usize },

    #[error("division by zero in column '{column}' at row {row}")]
    DivisionByZero { column: String, row: usize },

    #[error("arithmetic overflow in column '{column}' at row {row}")]
    Overflow { column: String, row: usize },

    #[error("capacity exceeded: requested {requested}, capacity {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },

    #[error("out of memory budget: requested {requested} bytes, {available} available")]
    OutOfBudget { requested: usize, available: usize },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

/// Result alias used throughout the crate.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
