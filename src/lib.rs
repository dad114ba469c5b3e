//! Shardcache - An in-process sharded key/value cache
//!
//! Provides concurrent store/fetch/update/delete with per-shard LRU eviction,
//! TTL expiration (lazy on fetch, active via a background sweep) and
//! whole-cache clear and iteration.
//!
//! ```ignore
//! let cache = Cache::new(16, 10_000, Duration::from_secs(1));
//! cache.store("answer", &42, Duration::from_secs(30))?;
//! let value: Option<i32> = cache.fetch("answer")?;
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{BufferPool, Cache, CacheBuilder, CacheStats};
pub use codec::{Codec, CodecError, JsonCodec};
pub use config::Config;
pub use error::{CacheError, Result};
