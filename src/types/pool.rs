//! Recycles [`ColumnBuffer`]s keyed by (kind, capacity, nullable) so
//! repeated chunk-sized allocations in a pipeline reuse backing storage.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::column_buffer::ColumnBuffer;
use crate::types::physical_type::Kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PoolKey {
    kind: Kind,
    capacity: usize,
    nullable: bool,
}

/// A buffer pool shared across a pipeline's operators. Acquire returns a
/// fresh buffer if none is recycled for the given shape; release returns a
/// used one (truncated and cleared) for reuse.
#[derive(Debug, Default)]
pub struct BufferPool {
    free: Mutex<HashMap<PoolKey, Vec<ColumnBuffer>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, kind: Kind, nullable: bool, capacity: usize) -> ColumnBuffer {
        let key = PoolKey { kind, capacity, nullable };
        let mut free = self.free.lock().unwrap();
        if let Some(bucket) = free.get_mut(&key) {
            if let Some(buf) = bucket.pop() {
                return buf;
            }
        }
        ColumnBuffer::with_capacity(kind, nullable, capacity)
    }

    pub fn release(&self, buf: ColumnBuffer) {
        let key = PoolKey { kind: buf.kind(), capacity: buf.capacity(), nullable: buf.nullable() };
        let mut free = self.free.lock().unwrap();
        free.entry(key).or_default().push(buf);
    }

    pub fn available_count(&self, kind: Kind, nullable: bool, capacity: usize) -> usize {
        let key = PoolKey { kind, capacity, nullable };
        self.free.lock().unwrap().get(&key).map(|b| b.len()).unwrap_or(0)
    }
}
