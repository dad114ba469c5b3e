//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

use crate::cache::lru::LruHandle;

// == Cache Entry ==
/// A single cache entry owned by exactly one shard.
#[derive(Debug)]
pub struct CacheEntry {
    /// Encoded value
    pub payload: Vec<u8>,
    /// Expiration instant, None = the TTL overflowed and the entry never expires
    pub expires_at: Option<Instant>,
    /// Position of the key in the shard's recency list
    pub lru_handle: LruHandle,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` after `now`.
    pub fn new(payload: Vec<u8>, now: Instant, ttl: Duration, lru_handle: LruHandle) -> Self {
        Self {
            payload,
            expires_at: expiry_from(now, ttl),
            lru_handle,
        }
    }

    // == Is Expired ==
    /// Whether a reader at `now` must treat this entry as gone.
    ///
    /// Strictly past the expiry instant; an entry is still readable at
    /// exactly `expires_at`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }

    // == Is Sweepable ==
    /// Whether the active sweep at `now` may reclaim this entry.
    pub fn is_sweepable_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => expires <= now,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or None if the entry never expires.
    ///
    /// Returns `Some(Duration::ZERO)` once the expiry instant has passed.
    #[cfg(test)]
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }
}

/// Computes `now + ttl`, or None if that instant is not representable.
pub fn expiry_from(now: Instant, ttl: Duration) -> Option<Instant> {
    now.checked_add(ttl)
}
