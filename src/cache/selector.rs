//! Shard Selector Module
//!
//! Maps keys onto shards with 32-bit FNV-1a.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over raw bytes.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    })
}

// == Shard Selector ==
/// Deterministic key to shard index mapping, fixed for a cache's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct ShardSelector {
    shard_count: u32,
}

impl ShardSelector {
    /// # Panics
    /// Panics if `shard_count` is zero or does not fit in a `u32`.
    pub fn new(shard_count: usize) -> Self {
        let shard_count = u32::try_from(shard_count)
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or_else(|| panic!("invalid shard count: {shard_count}"));
        Self { shard_count }
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count as usize
    }

    /// Index of the shard owning `key`.
    pub fn select(&self, key: &str) -> usize {
        (fnv1a_32(key.as_bytes()) % self.shard_count) as usize
    }
}
