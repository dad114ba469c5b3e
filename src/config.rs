//! Configuration Module
//!
//! Handles loading and validating cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of independent shards
    pub shard_count: usize,
    /// Maximum number of entries each shard can hold
    pub max_items_per_shard: usize,
    /// Background sweep interval
    pub sweep_interval: Duration,
    /// Default TTL in seconds for `store_default`
    pub default_ttl_secs: u64,
    /// Maximum number of idle payload buffers kept for reuse
    pub pool_capacity: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SHARD_COUNT` - Number of shards (default: 16)
    /// - `MAX_ITEMS_PER_SHARD` - Per-shard capacity (default: 10000)
    /// - `SWEEP_INTERVAL_MS` - Active expiry interval in ms (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `BUFFER_POOL_CAPACITY` - Idle payload buffers retained (default: 1024)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            shard_count: env_or("SHARD_COUNT", defaults.shard_count),
            max_items_per_shard: env_or("MAX_ITEMS_PER_SHARD", defaults.max_items_per_shard),
            sweep_interval: env::var("SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.sweep_interval),
            default_ttl_secs: env_or("DEFAULT_TTL", defaults.default_ttl_secs),
            pool_capacity: env_or("BUFFER_POOL_CAPACITY", defaults.pool_capacity),
        }
    }

    // == Validate ==
    /// Rejects parameters that would make the cache unusable.
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(CacheError::Configuration(
                "number of shards must be greater than 0".to_string(),
            ));
        }
        if self.max_items_per_shard == 0 {
            return Err(CacheError::Configuration(
                "maximum items per shard must be greater than 0".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(CacheError::Configuration(
                "sweep interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_count: 16,
            max_items_per_shard: 10_000,
            sweep_interval: Duration::from_secs(1),
            default_ttl_secs: 300,
            pool_capacity: 1_024,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
