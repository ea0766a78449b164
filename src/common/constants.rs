//! Crate-wide constants.

/// Default number of rows per chunk when no config overrides it.
pub const DEFAULT_CHUNK_SIZE: usize = 16384;

/// Sentinel used in place of a valid index.
pub const INVALID_INDEX: usize = usize::MAX;

/// Sentinel dictionary id for NULL string values.
pub const NULL_INDEX: i32 = -1;

/// Default global memory budget for a pipeline (1 GiB).
pub const DEFAULT_MEMORY_LIMIT: usize = 1024 * 1024 * 1024;

/// Allocations at or above this size consult the `MemoryTracker` before
/// proceeding.
pub const MEMORY_TRACK_THRESHOLD: usize = 64 * 1024;
