//! # Ouroboros Search Cache (ouroboros-search-cache)
//!
//! Result cache for expensive search/retrieval backends.
//!
//! ## Features
//!
//! - Fingerprinted cache keys (normalized query + search configuration)
//! - TTL expiry and memory-bounded LRU eviction
//! - Scope and file based invalidation for file watchers and editing tools
//! - Background refresh of frequently requested results
//! - Async-first design using tokio; safe to share across tasks
//!
//! ## Cache-through search
//!
//! [`CachedSearch`] wires a backend to a cache and owns the background
//! refresher. Construct it once at startup and shut it down when done.
//!
//! ```no_run
//! use ouroboros_search_cache::{CacheConfig, CacheKey, CachedSearch, CommandBackend};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CacheConfig::from_env()?;
//!     let mut search = CachedSearch::new(config, CommandBackend::new("rag-search"));
//!     search.start_refresher()?;
//!
//!     let key = CacheKey::builder("how are sessions persisted")
//!         .scope("/work/project")
//!         .build();
//!     let outcome = search.search(&key).await?;
//!     println!("hit: {}, results: {}", outcome.cache_hit, outcome.entry.result_count);
//!
//!     search.shutdown(Duration::from_secs(5)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Invalidation
//!
//! ```no_run
//! use ouroboros_search_cache::SearchResultCache;
//!
//! # async fn example(cache: &SearchResultCache) {
//! // A file changed: drop everything cached for its checkout
//! let removed = cache.invalidate_file("/work/project/src/lib.rs").await;
//!
//! // A whole corpus was re-indexed
//! let removed = cache.invalidate_scope("/work/project").await;
//! # }
//! ```

pub mod cache;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    BackgroundRefresher, CacheConfig, CacheConfigBuilder, CacheEntry, CacheKey, CacheKeyBuilder,
    CacheStats, CachedSearch, CommandBackend, CycleReport, InvalidationReason, RefreshStats,
    RefresherState, SearchBackend, SearchOutcome, SearchResultCache, SearchResults,
};
pub use error::{CacheError, Result};
