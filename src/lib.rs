//! colex - an in-process columnar data-processing engine.
//!
//! Ingests tabular data, represents it as typed columnar chunks, and runs a
//! pipeline of physical operators (filter, project, transform, sort, unique,
//! aggregate, join, concat, limit) over them, either materializing a result
//! or streaming it chunk by chunk.

pub mod common;
pub mod csv;
pub mod execution;
pub mod expression;
pub mod types;

pub use common::config::{MemoryConfig, ParseConfig, PipelineConfig};
pub use common::error::{EngineError, EngineResult};
pub use common::memory::MemoryTracker;

pub use types::chunk::Chunk;
pub use types::column_buffer::ColumnBuffer;
pub use types::dtype::DType;
pub use types::physical_type::Kind;
pub use types::schema::{ColumnDescriptor, Schema};
pub use types::value::Value;

pub use expression::ast::Expr;
pub use expression::compiler::compile;

pub use execution::pipeline::{Pipeline, PipelineResult};

pub use csv::{CsvOptions, CsvTokenizer, MmapCsvSource};
