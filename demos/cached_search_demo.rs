//! Cached Search Demo
//!
//! Runs a simulated slow search backend behind the cache, shows hits and
//! misses, lets the background refresher pick up a hot query, and then
//! invalidates by scope.
//!
//! Usage:
//!   cargo run --example cached_search_demo
//!
//! Environment variables:
//!   SEARCH_CACHE_TTL_SECONDS              - Entry lifetime (default: 300)
//!   SEARCH_CACHE_MAX_MEMORY_BYTES         - Memory budget (default: 100 MiB)
//!   SEARCH_CACHE_REFRESH_INTERVAL_SECONDS - Refresh cadence (demo default: 1)
//!   SEARCH_CACHE_HOT_THRESHOLD            - Accesses before refresh (demo default: 3)

use ouroboros_search_cache::cache::config::{ENV_HOT_THRESHOLD, ENV_REFRESH_INTERVAL_SECONDS};
use ouroboros_search_cache::{CacheConfig, CacheError, CacheKey, CachedSearch, SearchResults};
use std::time::{Duration, Instant};
use tracing::{info, Level};

async fn slow_search(key: CacheKey) -> Result<SearchResults, CacheError> {
    tokio::time::sleep(Duration::from_millis(250)).await;
    let ids = (0..3)
        .map(|i| format!("{}/doc_{}_{}.md", key.scope(), key.query().replace(' ', "_"), i))
        .collect();
    Ok(SearchResults::new(ids, vec![0.92, 0.71, 0.44]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("=== Search Result Cache Demo ===");

    let mut config = CacheConfig::from_env()?;
    if std::env::var(ENV_REFRESH_INTERVAL_SECONDS).is_err() {
        config.refresh_interval = Duration::from_secs(1);
    }
    if std::env::var(ENV_HOT_THRESHOLD).is_err() {
        config.hot_threshold = 3;
    }
    info!("Configuration: {:?}", config);

    let mut search = CachedSearch::new(config, slow_search);
    search.start_refresher()?;

    info!("\n--- Miss then hits ---");
    let key = CacheKey::builder("How are sessions persisted")
        .scope("/work/project")
        .build();
    for _ in 0..4 {
        let start = Instant::now();
        let outcome = search.search(&key).await?;
        info!(
            "{} in {:?} ({} results, access count {})",
            if outcome.cache_hit { "HIT " } else { "MISS" },
            start.elapsed(),
            outcome.entry.result_count,
            outcome.entry.access_count
        );
    }

    info!("\n--- Background refresh ---");
    info!("Hot keys: {:?}", search.cache().hot_keys(3).await);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    if let Some(refresher) = search.refresher() {
        info!("Refresher stats: {:?}", refresher.stats());
    }
    if let Some(entry) = search.cache().peek(&key).await {
        info!(
            "Entry age after refresh: {:?}, access count reset to {}",
            entry.age(),
            entry.access_count
        );
    }

    info!("\n--- Scope invalidation ---");
    let other = CacheKey::builder("error handling").scope("/work/other").build();
    search.search(&other).await?;
    let removed = search.cache().invalidate_scope("/work/project").await;
    info!("Removed {} entries under /work/project", removed);
    info!("Still cached: {:?}", search.cache().keys_by_recency().await);

    info!("\n--- Statistics ---");
    info!("{}", search.cache().stats().await);

    search.shutdown(Duration::from_secs(5)).await?;
    info!("=== Demo complete ===");
    Ok(())
}
