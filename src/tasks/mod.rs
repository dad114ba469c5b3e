//! Background Tasks Module
//!
//! Contains background tasks that run periodically for the lifetime of a cache.
//!
//! # Tasks
//! - TTL Sweep: Removes expired entries from every shard at a fixed interval

mod sweep;

pub use sweep::{spawn_sweep_task, SweepHandle};
