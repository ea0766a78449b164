//! Memory accounting injected into pipelines and large buffer allocations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::common::error::{EngineError, EngineResult};

/// Reserves and releases byte budget. Consulted before any allocation at or
/// above [`crate::common::constants::MEMORY_TRACK_THRESHOLD`].
pub trait MemoryTracker: Send + Sync {
    /// Reserve `bytes` against the budget, failing with `OutOfBudget` if
    /// doing so would exceed the limit.
    fn reserve(&self, bytes: usize) -> EngineResult<()>;

    /// Release a previously reserved amount.
    fn release(&self, bytes: usize);

    /// Bytes currently reserved.
    fn used(&self) -> usize;

    /// Total budget.
    fn limit(&self) -> usize;
}

/// Atomic-counter backed tracker, the default collaborator pipelines use
/// unless the caller injects their own.
#[derive(Debug)]
pub struct AtomicMemoryTracker {
    limit: usize,
    used: AtomicUsize,
}

impl AtomicMemoryTracker {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    pub fn shared(limit: usize) -> Arc<dyn MemoryTracker> {
        Arc::new(Self::new(limit))
    }
}

impl MemoryTracker for AtomicMemoryTracker {
    fn reserve(&self, bytes: usize) -> EngineResult<()> {
        loop {
            let current = self.used.load(Ordering::Acquire);
            let next = current.checked_add(bytes).unwrap_or(usize::MAX);
            if next > self.limit {
                return Err(EngineError::OutOfBudget {
                    requested: bytes,
                    available: self.limit.saturating_sub(current),
                });
            }
            if self
                .used
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes.min(self.used.load(Ordering::Acquire)), Ordering::AcqRel);
    }

    fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    fn limit(&self) -> usize {
        self.limit
    }
}

/// A tracker that never rejects a reservation; used in tests and for callers
/// that disable budget enforcement via `MemoryConfig::enabled = false`.
#[derive(Debug, Default)]
pub struct UnboundedMemoryTracker {
    used: AtomicUsize,
}

impl MemoryTracker for UnboundedMemoryTracker {
    fn reserve(&self, bytes: usize) -> EngineResult<()> {
        self.used.fetch_add(bytes, Ordering::AcqRel);
        Ok(())
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes.min(self.used.load(Ordering::Acquire)), Ordering::AcqRel);
    }

    fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    fn limit(&self) -> usize {
        usize::MAX
    }
}
