//! Shard Module
//!
//! One independent partition of the key space: a HashMap of entries plus the
//! LRU order over the same keys.
//!
//! A `Shard` is not synchronized by itself. The engine wraps every shard in
//! a single mutex so the map and the recency list are always observed
//! together; a key is in `entries` exactly when it is in `lru`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::entry::expiry_from;
use crate::cache::{BufferPool, CacheEntry, CacheStats, LruTracker};

// == Shard ==
#[derive(Debug)]
pub struct Shard {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Per-shard counters, folded together by the engine
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_items: usize,
    /// Destination for payload buffers that leave the shard
    pool: Arc<BufferPool>,
}

impl Shard {
    // == Constructor ==
    pub fn new(max_items: usize, pool: Arc<BufferPool>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_items,
            pool,
        }
    }

    // == Insert ==
    /// Stores a payload under `key`, replacing any previous entry.
    ///
    /// The key becomes the most recently used. If the shard then holds more
    /// than `max_items` entries, exactly one entry is evicted from the LRU
    /// end regardless of its TTL. Returns the evicted key, if any.
    pub fn insert(
        &mut self,
        key: String,
        payload: Vec<u8>,
        now: Instant,
        ttl: Duration,
    ) -> Option<String> {
        if let Some(old) = self.entries.remove(&key) {
            self.lru.remove(old.lru_handle);
            self.pool.release(old.payload);
        }

        let handle = self.lru.push_front(key.clone());
        self.entries
            .insert(key, CacheEntry::new(payload, now, ttl, handle));

        if self.entries.len() <= self.max_items {
            return None;
        }

        let evicted = self.lru.evict_oldest()?;
        if let Some(entry) = self.entries.remove(&evicted) {
            self.pool.release(entry.payload);
        }
        self.stats.record_eviction();
        debug!(key = %evicted, "evicted least recently used entry");
        Some(evicted)
    }

    // == Fetch ==
    /// Returns the payload of a live entry and marks it most recently used.
    ///
    /// An entry past its expiry is removed on the spot and reported as
    /// absent, exactly like a key that was never stored. Misses are counted
    /// here; the caller records the hit once it has used the payload.
    pub fn fetch(&mut self, key: &str, now: Instant) -> Option<&[u8]> {
        let (handle, expired) = match self.entries.get(key) {
            Some(entry) => (entry.lru_handle, entry.is_expired_at(now)),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_miss();
            self.stats.record_expirations(1);
            debug!(key, "lazily expired entry on fetch");
            return None;
        }

        self.lru.touch(handle);
        self.entries.get(key).map(|entry| entry.payload.as_slice())
    }

    pub fn record_hit(&mut self) {
        self.stats.record_hit();
    }

    // == Update ==
    /// Replaces payload and expiry of an existing entry in place.
    ///
    /// Returns the payload back untouched if the key is absent; update never
    /// creates entries. An expired entry that the sweep has not reclaimed
    /// yet is absent too, and is removed on the spot.
    pub fn update(
        &mut self,
        key: &str,
        payload: Vec<u8>,
        now: Instant,
        ttl: Duration,
    ) -> Result<(), Vec<u8>> {
        match self.entries.get(key) {
            None => return Err(payload),
            Some(entry) if entry.is_expired_at(now) => {
                self.remove_entry(key);
                self.stats.record_expirations(1);
                debug!(key, "lazily expired entry on update");
                return Err(payload);
            }
            Some(_) => {}
        }

        let Some(entry) = self.entries.get_mut(key) else {
            return Err(payload);
        };

        let old = std::mem::replace(&mut entry.payload, payload);
        entry.expires_at = expiry_from(now, ttl);
        let handle = entry.lru_handle;

        self.lru.touch(handle);
        self.pool.release(old);
        Ok(())
    }

    // == Remove ==
    /// Removes an entry. Returns whether anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Contains ==
    /// Whether `key` holds a live entry. Does not touch recency.
    pub fn contains(&self, key: &str, now: Instant) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == Sweep Expired ==
    /// Removes every entry whose expiry is at or before `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_sweepable_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired.len());
        expired.len()
    }

    // == Clear ==
    /// Drops every entry and resets the LRU order. Returns how many were held.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            self.pool.release(entry.payload);
        }
        self.lru.clear();
        count
    }

    // == For Each Live ==
    /// Visits every non-expired entry's key and raw payload once.
    ///
    /// Expired entries are skipped and left for the sweep.
    pub fn for_each_live<F>(&self, now: Instant, visit: &mut F)
    where
        F: FnMut(&str, &[u8]),
    {
        for (key, entry) in &self.entries {
            if !entry.is_expired_at(now) {
                visit(key, &entry.payload);
            }
        }
    }

    // == Stats ==
    /// Returns this shard's counters with the current entry count.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys from most to least recently used.
    pub fn lru_order(&self) -> Vec<&str> {
        self.lru.order()
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.lru.remove(entry.lru_handle);
                self.pool.release(entry.payload);
                true
            }
            None => false,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_secs(300);

    fn shard(max_items: usize) -> Shard {
        Shard::new(max_items, Arc::new(BufferPool::new(16)))
    }

    fn put(shard: &mut Shard, key: &str, now: Instant) -> Option<String> {
        shard.insert(key.to_string(), key.as_bytes().to_vec(), now, LONG)
    }

    fn assert_consistent(shard: &Shard) {
        let order = shard.lru_order();
        assert_eq!(order.len(), shard.len());
        for key in order {
            assert!(shard.entries.contains_key(key));
        }
    }

    #[test]
    fn test_shard_insert_and_fetch() {
        let mut s = shard(10);
        let now = Instant::now();

        put(&mut s, "key1", now);

        assert_eq!(s.fetch("key1", now), Some(&b"key1"[..]));
        assert_eq!(s.len(), 1);
        assert_consistent(&s);
    }

    #[test]
    fn test_shard_fetch_missing() {
        let mut s = shard(10);
        assert_eq!(s.fetch("nope", Instant::now()), None);
        assert_eq!(s.stats().misses, 1);
    }

    #[test]
    fn test_shard_overwrite_does_not_duplicate() {
        let mut s = shard(10);
        let now = Instant::now();

        put(&mut s, "key1", now);
        s.insert("key1".to_string(), b"v2".to_vec(), now, LONG);

        assert_eq!(s.len(), 1);
        assert_eq!(s.lru_order(), vec!["key1"]);
        assert_eq!(s.fetch("key1", now), Some(&b"v2"[..]));
    }

    #[test]
    fn test_shard_lru_eviction() {
        let mut s = shard(2);
        let now = Instant::now();

        assert_eq!(put(&mut s, "a", now), None);
        assert_eq!(put(&mut s, "b", now), None);
        assert!(s.fetch("a", now).is_some());
        assert_eq!(put(&mut s, "c", now), Some("b".to_string()));

        assert_eq!(s.len(), 2);
        assert!(s.fetch("b", now).is_none());
        assert!(s.fetch("a", now).is_some());
        assert!(s.fetch("c", now).is_some());
        assert_eq!(s.stats().evictions, 1);
        assert_consistent(&s);
    }

    #[test]
    fn test_eviction_ignores_ttl() {
        let mut s = shard(2);
        let now = Instant::now();

        // Oldest entry is long lived, newer one is nearly expired
        put(&mut s, "long", now);
        s.insert("short".to_string(), b"s".to_vec(), now, Duration::from_millis(1));
        put(&mut s, "third", now);

        assert!(!s.contains("long", now));
        assert!(s.contains("short", now));
    }

    #[test]
    fn test_shard_lazy_expiration() {
        let mut s = shard(10);
        let now = Instant::now();

        s.insert("k".to_string(), b"v".to_vec(), now, Duration::from_secs(2));

        assert!(s.fetch("k", now + Duration::from_secs(1)).is_some());
        assert!(s.fetch("k", now + Duration::from_secs(3)).is_none());
        assert!(s.is_empty());
        assert!(s.lru_order().is_empty());
        assert_eq!(s.stats().expirations, 1);
    }

    #[test]
    fn test_shard_update_existing() {
        let mut s = shard(10);
        let now = Instant::now();

        put(&mut s, "a", now);
        put(&mut s, "b", now);
        let later = now + Duration::from_secs(1);
        assert!(s
            .update("a", b"new".to_vec(), later, Duration::from_secs(5))
            .is_ok());

        assert_eq!(s.lru_order(), vec!["a", "b"]);
        assert_eq!(s.len(), 2);
        // TTL clock restarted at `later`
        assert!(s.contains("a", now + Duration::from_secs(6)));
        assert!(!s.contains("a", now + Duration::from_secs(7)));
    }

    #[test]
    fn test_shard_update_missing() {
        let mut s = shard(10);
        let result = s.update("ghost", b"v".to_vec(), Instant::now(), LONG);

        assert_eq!(result, Err(b"v".to_vec()));
        assert!(s.is_empty());
    }

    #[test]
    fn test_shard_update_expired_is_absent() {
        let mut s = shard(10);
        let now = Instant::now();

        s.insert("k".to_string(), b"old".to_vec(), now, Duration::from_secs(1));
        let later = now + Duration::from_secs(2);
        let result = s.update("k", b"new".to_vec(), later, LONG);

        assert_eq!(result, Err(b"new".to_vec()));
        assert!(s.is_empty());
        assert!(s.lru_order().is_empty());
        assert!(s.fetch("k", later).is_none());
        assert_eq!(s.stats().expirations, 1);
    }

    #[test]
    fn test_fetch_leaves_hit_to_caller() {
        let mut s = shard(10);
        let now = Instant::now();
        put(&mut s, "k", now);

        assert!(s.fetch("k", now).is_some());
        assert_eq!(s.stats().hits, 0);
        assert_eq!(s.stats().misses, 0);

        s.record_hit();
        assert_eq!(s.stats().hits, 1);
    }

    #[test]
    fn test_shard_remove_idempotent() {
        let mut s = shard(10);
        let now = Instant::now();

        put(&mut s, "k", now);
        assert!(s.remove("k"));
        assert!(!s.remove("k"));
        assert!(!s.remove("never"));
        assert!(s.is_empty());
        assert_consistent(&s);
    }

    #[test]
    fn test_shard_sweep_expired() {
        let mut s = shard(10);
        let now = Instant::now();

        s.insert("short".to_string(), b"1".to_vec(), now, Duration::from_secs(1));
        s.insert("long".to_string(), b"2".to_vec(), now, Duration::from_secs(10));

        assert_eq!(s.sweep_expired(now), 0);
        assert_eq!(s.sweep_expired(now + Duration::from_secs(2)), 1);
        assert_eq!(s.len(), 1);
        assert!(s.contains("long", now));
        assert_consistent(&s);
    }

    #[test]
    fn test_shard_clear() {
        let mut s = shard(10);
        let now = Instant::now();
        for i in 0..5 {
            put(&mut s, &format!("k{i}"), now);
        }

        assert_eq!(s.clear(), 5);
        assert!(s.is_empty());
        assert!(s.lru_order().is_empty());
        assert!(s.fetch("k0", now).is_none());
    }

    #[test]
    fn test_for_each_live_skips_expired() {
        let mut s = shard(10);
        let now = Instant::now();

        s.insert("dead".to_string(), b"1".to_vec(), now, Duration::from_secs(1));
        s.insert("alive".to_string(), b"2".to_vec(), now, Duration::from_secs(10));

        let mut seen = Vec::new();
        s.for_each_live(now + Duration::from_secs(2), &mut |key, payload| {
            seen.push((key.to_string(), payload.to_vec()));
        });

        assert_eq!(seen, vec![("alive".to_string(), b"2".to_vec())]);
        // Iteration never removes anything
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_removed_payloads_return_to_pool() {
        let pool = Arc::new(BufferPool::new(16));
        let mut s = Shard::new(1, pool.clone());
        let now = Instant::now();

        s.insert("a".to_string(), b"aaaa".to_vec(), now, LONG);
        s.insert("b".to_string(), b"bbbb".to_vec(), now, LONG);
        assert_eq!(pool.idle(), 1);

        s.remove("b");
        assert_eq!(pool.idle(), 2);
    }
}
