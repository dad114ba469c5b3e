//! Cache Store Module
//!
//! Main cache engine: routes each key to one shard, runs every per-key
//! operation under that shard's lock, and fans whole-cache operations out
//! across shards.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{BufferPool, CacheStats, Shard, ShardSelector};
use crate::codec::{Codec, JsonCodec};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_sweep_task, SweepHandle};

// == Shard Set ==
/// The fixed array of shards plus the selector that routes keys to them.
///
/// Shared between the engine and its background sweep task. No method ever
/// holds more than one shard lock at a time.
#[derive(Debug)]
pub struct ShardSet {
    shards: Vec<Mutex<Shard>>,
    selector: ShardSelector,
}

impl ShardSet {
    pub fn new(shard_count: usize, max_items_per_shard: usize, pool: Arc<BufferPool>) -> Self {
        let shards = (0..shard_count)
            .map(|_| Mutex::new(Shard::new(max_items_per_shard, pool.clone())))
            .collect();
        Self {
            shards,
            selector: ShardSelector::new(shard_count),
        }
    }

    /// The shard owning `key`.
    pub fn shard_for(&self, key: &str) -> &Mutex<Shard> {
        &self.shards[self.selector.select(key)]
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    // == Sweep Expired ==
    /// Removes every expired entry from every shard, shards in parallel.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        self.shards
            .par_iter()
            .map(|shard| shard.lock().sweep_expired(Instant::now()))
            .sum()
    }

    // == Clear ==
    /// Empties every shard in parallel and waits for all of them.
    pub fn clear(&self) -> usize {
        self.shards
            .par_iter()
            .map(|shard| shard.lock().clear())
            .sum()
    }

    /// Visits the live entries of each shard in turn, one shard lock at a time.
    pub fn for_each_live<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &[u8]),
    {
        for shard in &self.shards {
            shard.lock().for_each_live(Instant::now(), &mut visit);
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut total = CacheStats::new();
        for shard in &self.shards {
            total.merge(&shard.lock().stats());
        }
        total
    }

    pub fn entry_count(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }
}

// == Cache Builder ==
/// Configures and constructs a [`Cache`].
#[derive(Debug)]
pub struct CacheBuilder<C = JsonCodec> {
    config: Config,
    codec: C,
    pool: Option<Arc<BufferPool>>,
}

impl CacheBuilder<JsonCodec> {
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    /// Starts from an existing configuration, e.g. one read via [`Config::from_env`].
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            codec: JsonCodec,
            pool: None,
        }
    }
}

impl Default for CacheBuilder<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> CacheBuilder<C> {
    pub fn shard_count(mut self, shard_count: usize) -> Self {
        self.config.shard_count = shard_count;
        self
    }

    pub fn max_items_per_shard(mut self, max_items: usize) -> Self {
        self.config.max_items_per_shard = max_items;
        self
    }

    /// Period of the background active-expiry pass.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// TTL used by [`Cache::store_default`]. Second resolution.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl_secs = ttl.as_secs();
        self
    }

    /// Shares an existing buffer pool instead of creating one per cache.
    pub fn buffer_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Swaps the payload codec.
    pub fn codec<D: Codec>(self, codec: D) -> CacheBuilder<D> {
        CacheBuilder {
            config: self.config,
            codec,
            pool: self.pool,
        }
    }

    // == Build ==
    /// Validates the configuration and starts the background sweep task.
    ///
    /// Inside a tokio runtime the sweep becomes a task on that runtime,
    /// otherwise it gets a dedicated thread.
    pub fn build(self) -> Result<Cache<C>> {
        self.config.validate()?;

        let pool = self
            .pool
            .unwrap_or_else(|| Arc::new(BufferPool::new(self.config.pool_capacity)));
        let shards = Arc::new(ShardSet::new(
            self.config.shard_count,
            self.config.max_items_per_shard,
            pool.clone(),
        ));
        let sweeper = spawn_sweep_task(shards.clone(), self.config.sweep_interval)?;

        info!(
            shards = self.config.shard_count,
            max_items_per_shard = self.config.max_items_per_shard,
            sweep_interval = ?self.config.sweep_interval,
            "cache initialized"
        );

        Ok(Cache {
            shards,
            codec: self.codec,
            pool,
            max_items_per_shard: self.config.max_items_per_shard,
            default_ttl: self.config.default_ttl(),
            sweeper,
        })
    }
}

// == Cache ==
/// Concurrency-safe sharded cache with per-shard LRU eviction and TTL expiry.
///
/// Values pass through the codec `C` on the way in and out; shards only ever
/// see opaque payload bytes. Share a cache between threads with `Arc<Cache>`.
/// Dropping it stops the background sweep task.
#[derive(Debug)]
pub struct Cache<C: Codec = JsonCodec> {
    shards: Arc<ShardSet>,
    codec: C,
    pool: Arc<BufferPool>,
    max_items_per_shard: usize,
    default_ttl: Duration,
    sweeper: SweepHandle,
}

impl Cache<JsonCodec> {
    // == Constructors ==
    /// Creates a cache and starts its sweep task.
    ///
    /// # Panics
    /// Panics if `shard_count`, `max_items_per_shard` or `sweep_interval` is
    /// zero. These are programming errors; see [`Cache::try_new`] for the
    /// fallible form.
    pub fn new(shard_count: usize, max_items_per_shard: usize, sweep_interval: Duration) -> Self {
        Self::try_new(shard_count, max_items_per_shard, sweep_interval)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(
        shard_count: usize,
        max_items_per_shard: usize,
        sweep_interval: Duration,
    ) -> Result<Self> {
        Self::builder()
            .shard_count(shard_count)
            .max_items_per_shard(max_items_per_shard)
            .sweep_interval(sweep_interval)
            .build()
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        CacheBuilder::from_config(config.clone()).build()
    }

    pub fn builder() -> CacheBuilder<JsonCodec> {
        CacheBuilder::new()
    }
}

impl<C: Codec> Cache<C> {
    // == Store ==
    /// Inserts or replaces `key`, expiring `ttl` from now.
    ///
    /// The key becomes the shard's most recently used. If the shard is over
    /// capacity afterwards its least recently used entry is evicted. A value
    /// that fails to encode leaves the cache untouched.
    pub fn store<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        validate_key(key)?;
        let payload = self.encode(key, value)?;
        self.shards
            .shard_for(key)
            .lock()
            .insert(key.to_string(), payload, Instant::now(), ttl);
        Ok(())
    }

    /// Stores with the configured default TTL.
    pub fn store_default<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.store(key, value, self.default_ttl)
    }

    // == Fetch ==
    /// Returns the live value for `key`, or `Ok(None)` if absent or expired.
    ///
    /// A hit marks the key most recently used. A payload that fails to decode
    /// is reported as [`CacheError::DecodingFailed`] and stays in the cache;
    /// it counts as neither hit nor miss.
    pub fn fetch<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let mut shard = self.shards.shard_for(key).lock();
        let decoded = {
            let Some(payload) = shard.fetch(key, Instant::now()) else {
                return Ok(None);
            };
            self.codec.decode::<T>(payload)
        };

        match decoded {
            Ok(value) => {
                shard.record_hit();
                Ok(Some(value))
            }
            Err(e) => {
                warn!(key, error = %e, "stored payload failed to decode");
                Err(CacheError::DecodingFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Like [`Cache::fetch`] but returns the raw payload without decoding.
    pub fn fetch_bytes(&self, key: &str) -> Option<Vec<u8>> {
        let mut shard = self.shards.shard_for(key).lock();
        let payload = shard.fetch(key, Instant::now()).map(<[u8]>::to_vec)?;
        shard.record_hit();
        Some(payload)
    }

    // == Update ==
    /// Replaces the value and restarts the TTL of an existing key.
    ///
    /// Fails with [`CacheError::KeyNotFound`] if the key is absent; update
    /// never creates entries.
    pub fn update<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        validate_key(key)?;
        let payload = self.encode(key, value)?;
        let result = self
            .shards
            .shard_for(key)
            .lock()
            .update(key, payload, Instant::now(), ttl);

        result.map_err(|payload| {
            self.pool.release(payload);
            CacheError::KeyNotFound(key.to_string())
        })
    }

    // == Delete ==
    /// Removes `key` if present. Deleting an absent key is a no-op.
    pub fn delete(&self, key: &str) {
        self.shards.shard_for(key).lock().remove(key);
    }

    /// Whether `key` currently holds a live entry. Does not affect recency.
    pub fn contains(&self, key: &str) -> bool {
        self.shards
            .shard_for(key)
            .lock()
            .contains(key, Instant::now())
    }

    // == Clear ==
    /// Removes every entry from every shard before returning.
    pub fn clear(&self) {
        let removed = self.shards.clear();
        info!(removed, "cache cleared");
    }

    // == Iterate ==
    /// Calls `visit` once for each live key and its raw payload.
    ///
    /// Shards are visited one after another and each shard stays locked
    /// while its entries are visited, so `visit` must be quick and must not
    /// call back into this cache. Expired entries are skipped, not removed.
    pub fn iterate<F>(&self, visit: F)
    where
        F: FnMut(&str, &[u8]),
    {
        self.shards.for_each_live(visit);
    }

    // == Sweep Expired ==
    /// Runs one active-expiry pass now. Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        self.shards.sweep_expired()
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.shards.stats()
    }

    /// Number of entries held, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.shards.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn max_items_per_shard(&self) -> usize {
        self.max_items_per_shard
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Stops the background sweep task. Lazy expiry on fetch keeps working.
    pub fn shutdown(&self) {
        self.sweeper.stop();
    }

    /// Whether the background sweep is still running.
    pub fn is_sweeping(&self) -> bool {
        !self.sweeper.is_finished()
    }

    fn encode<T>(&self, key: &str, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let mut buf = self.pool.acquire();
        match self.codec.encode(value, &mut buf) {
            Ok(()) => Ok(buf),
            Err(e) => {
                self.pool.release(buf);
                Err(CacheError::EncodingFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}
