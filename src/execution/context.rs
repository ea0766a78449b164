//! Per-pipeline execution context: memory budget and cancellation.

use std::sync::Arc;

use crate::common::config::CancellationToken;
use crate::common::memory::{MemoryTracker, UnboundedMemoryTracker};

/// Shared state every operator in a pipeline can consult: the injected
/// [`MemoryTracker`] and a cooperative [`CancellationToken`]. Cloning an
/// `ExecutionContext` clones the `Arc`s, not the underlying state.
#[derive(Clone)]
pub struct ExecutionContext {
    pub memory: Arc<dyn MemoryTracker>,
    pub cancellation: CancellationToken,
}

impl ExecutionContext {
    pub fn new(memory: Arc<dyn MemoryTracker>, cancellation: CancellationToken) -> Self {
        Self { memory, cancellation }
    }

    pub fn unbounded() -> Self {
        Self {
            memory: Arc::new(UnboundedMemoryTracker::default()),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::unbounded()
    }
}
