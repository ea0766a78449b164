//! Serde-backed configuration structs, loadable from JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::common::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MEMORY_LIMIT};
use crate::common::error::EngineResult;

/// Governs the shared memory budget consulted by pipelines and large
/// buffer allocations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// Total bytes a single pipeline run may reserve.
    #[serde(default = "default_global_limit_bytes")]
    pub global_limit_bytes: usize,

    /// Fraction of the global limit a single task may hold at once.
    #[serde(default = "default_max_task_share_percent")]
    pub max_task_share_percent: f64,

    /// Whether budget tracking is enforced at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_global_limit_bytes() -> usize {
    DEFAULT_MEMORY_LIMIT
}
fn default_max_task_share_percent() -> f64 {
    0.7
}
fn default_enabled() -> bool {
    true
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            global_limit_bytes: default_global_limit_bytes(),
            max_task_share_percent: default_max_task_share_percent(),
            enabled: default_enabled(),
        }
    }
}

/// CSV ingestion options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: u8,
    #[serde(default = "default_quote")]
    pub quote: u8,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub max_rows: Option<usize>,
    #[serde(default)]
    pub projection: Option<Vec<String>>,
    #[serde(default = "default_null_literals")]
    pub null_literals: HashSet<String>,
}

fn default_delimiter() -> u8 {
    b','
}
fn default_quote() -> u8 {
    b'"'
}
fn default_has_header() -> bool {
    true
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_null_literals() -> HashSet<String> {
    ["NA", "null", "-", ""].iter().map(|s| s.to_string()).collect()
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            quote: default_quote(),
            has_header: default_has_header(),
            chunk_size: default_chunk_size(),
            skip_rows: 0,
            max_rows: None,
            projection: None,
            null_literals: default_null_literals(),
        }
    }
}

impl ParseConfig {
    pub fn from_json(text: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(text).map_err(|e| crate::common::error::EngineError::InvalidArgument {
            message: format!("invalid ParseConfig JSON: {e}"),
        })?)
    }
}

/// Controls pipeline cancellation.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub cancellation_token: CancellationToken,
}

/// A cooperative cancellation flag shared between a pipeline driver and
/// whoever wants to stop it mid-execution.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(std::sync::atomic::Ordering::SeqCst)
    }
}
