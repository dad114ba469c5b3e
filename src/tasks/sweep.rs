//! TTL Sweep Task
//!
//! Background task that periodically removes expired entries from every shard,
//! bounding how long unread entries linger after their TTL.
//!
//! Inside a tokio runtime the sweep runs as a task on that runtime. Outside
//! one it runs on a dedicated thread driving its own current-thread runtime.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ShardSet;
use crate::error::{CacheError, Result};

#[derive(Debug)]
enum Runner {
    Task(JoinHandle<()>),
    Thread(Mutex<Option<thread::JoinHandle<()>>>),
}

// == Sweep Handle ==
/// Owner of a running sweep. Dropping it stops the sweep.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    runner: Runner,
}

impl SweepHandle {
    /// Stops the sweep. A pass already running finishes its current shards
    /// first; on a dedicated thread this waits for that pass.
    pub fn stop(&self) {
        if self.is_finished() {
            return;
        }
        let _ = self.shutdown.send(true);
        match &self.runner {
            Runner::Task(handle) => handle.abort(),
            Runner::Thread(thread) => {
                if let Some(thread) = thread.lock().take() {
                    if thread.join().is_err() {
                        warn!("TTL sweep thread panicked");
                    }
                }
            }
        }
        info!("TTL sweep task stopped");
    }

    pub fn is_finished(&self) -> bool {
        match &self.runner {
            Runner::Task(handle) => handle.is_finished(),
            Runner::Thread(thread) => thread
                .lock()
                .as_ref()
                .map_or(true, |thread| thread.is_finished()),
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts sweeping expired entries every `interval`.
///
/// The sweep sleeps first, so nothing is swept at startup. Each pass runs on
/// tokio's blocking pool because it walks whole shards under their locks.
///
/// # Example
/// ```ignore
/// let shards = Arc::new(ShardSet::new(16, 10_000, Arc::new(BufferPool::default())));
/// let sweeper = spawn_sweep_task(shards.clone(), Duration::from_secs(1))?;
/// // Later, during shutdown:
/// sweeper.stop();
/// ```
pub fn spawn_sweep_task(shards: Arc<ShardSet>, interval: Duration) -> Result<SweepHandle> {
    let (shutdown, signal) = watch::channel(false);

    let runner = match tokio::runtime::Handle::try_current() {
        Ok(handle) => Runner::Task(handle.spawn(run_sweeps(shards, interval, signal))),
        Err(_) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| {
                    CacheError::Configuration(format!("failed to build sweep runtime: {e}"))
                })?;
            let thread = thread::Builder::new()
                .name("shardcache-sweep".to_string())
                .spawn(move || runtime.block_on(run_sweeps(shards, interval, signal)))
                .map_err(|e| {
                    CacheError::Configuration(format!("failed to start sweep thread: {e}"))
                })?;
            Runner::Thread(Mutex::new(Some(thread)))
        }
    };

    Ok(SweepHandle { shutdown, runner })
}

async fn run_sweeps(shards: Arc<ShardSet>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    info!("Starting TTL sweep task with interval of {:?}", interval);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => break,
        }

        let pass = shards.clone();
        let removed = match tokio::task::spawn_blocking(move || pass.sweep_expired()).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "TTL sweep pass did not complete");
                continue;
            }
        };

        if removed > 0 {
            info!("TTL sweep: removed {} expired entries", removed);
        } else {
            debug!("TTL sweep: no expired entries found");
        }
    }
}
