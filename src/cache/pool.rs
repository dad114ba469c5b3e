//! Buffer Pool Module
//!
//! Recycles payload buffers across insert/evict cycles.

use std::fmt;

use parking_lot::Mutex;

/// Buffers larger than this are dropped instead of pooled.
pub const MAX_POOLED_BUFFER_BYTES: usize = 64 * 1024;

// == Buffer Pool ==
/// Bounded pool of payload buffers shared by every shard of a cache.
///
/// Buffers handed out by [`BufferPool::acquire`] are always empty. A buffer
/// given back through [`BufferPool::release`] is owned by the pool again and
/// reaches at most one later caller.
pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
    capacity: usize,
}

impl BufferPool {
    // == Constructor ==
    /// Creates a pool retaining at most `capacity` idle buffers.
    ///
    /// A capacity of zero disables pooling.
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    // == Acquire ==
    /// Takes an empty buffer, reusing an idle allocation when one exists.
    pub fn acquire(&self) -> Vec<u8> {
        self.idle.lock().pop().unwrap_or_default()
    }

    // == Release ==
    /// Returns a buffer for reuse. Contents are wiped before it is pooled.
    pub fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() == 0 || buf.capacity() > MAX_POOLED_BUFFER_BYTES {
            return;
        }
        buf.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(buf);
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(1_024)
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle())
            .field("capacity", &self.capacity)
            .finish()
    }
}
