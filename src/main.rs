//! Shardcache demo
//!
//! Stores two values with short TTLs and watches them expire.

use std::time::Duration;

use shardcache::{Cache, Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shardcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: shards={}, max_items_per_shard={}, sweep_interval={:?}",
        config.shard_count, config.max_items_per_shard, config.sweep_interval
    );

    let cache = Cache::from_config(&config)?;

    cache.store("age", &33, Duration::from_secs(3))?;
    cache.store("name", "aboubakr", Duration::from_secs(5))?;

    report(&cache, "age")?;

    // "age" expires, "name" survives
    tokio::time::sleep(Duration::from_secs(4)).await;
    report(&cache, "age")?;
    report(&cache, "name")?;

    tokio::time::sleep(Duration::from_secs(2)).await;
    report(&cache, "name")?;

    let stats = cache.stats();
    info!(
        "Stats: hits={}, misses={}, expirations={}, hit_rate={:.2}",
        stats.hits,
        stats.misses,
        stats.expirations,
        stats.hit_rate()
    );

    cache.shutdown();
    Ok(())
}

fn report(cache: &Cache, key: &str) -> anyhow::Result<()> {
    match cache.fetch::<serde_json::Value>(key)? {
        Some(value) => info!("Fetched {}: {}", key, value),
        None => info!("{} does not exist or has expired", key),
    }
    Ok(())
}
