//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Absence is never an error: a miss on fetch is reported as `Ok(None)` and
/// deleting an absent key is a no-op.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Invalid construction parameters (zero shards, zero capacity, no runtime)
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Key rejected before touching any shard
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Value could not be turned into a payload; nothing was written
    #[error("Encoding failed for key {key}: {reason}")]
    EncodingFailed { key: String, reason: String },

    /// Stored payload could not be turned back into a value; entry left in place
    #[error("Decoding failed for key {key}: {reason}")]
    DecodingFailed { key: String, reason: String },

    /// Update target is absent
    #[error("Key not found: {0}")]
    KeyNotFound(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
