//! Cache Module
//!
//! Provides a sharded in-memory cache with TTL expiration and LRU eviction.

mod entry;
mod lru;
mod pool;
mod selector;
mod shard;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::{LruHandle, LruTracker};
pub use pool::BufferPool;
pub use selector::{fnv1a_32, ShardSelector};
pub use shard::Shard;
pub use stats::CacheStats;
pub use store::{Cache, CacheBuilder, ShardSet};
