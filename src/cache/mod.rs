//! # Search Result Cache
//!
//! Caching layer in front of an expensive search backend (a semantic or
//! full-text search run as a subprocess or network call).
//!
//! ## Features
//!
//! - **Query fingerprints**: keys combine the normalized query with every
//!   setting that changes the result (scope, limits, model, index version)
//! - **TTL-Based Expiration**: stale entries are dropped lazily on lookup
//! - **Memory-Bounded LRU Eviction**: least recently used entries are evicted
//!   once the accounted size exceeds the budget
//! - **Scope Invalidation**: drop everything under a workspace, or everything
//!   affected by a single changed file
//! - **Background Refresh**: hot entries are recomputed ahead of expiry so
//!   popular queries rarely miss
//!
//! ## Example
//!
//! ```rust
//! use ouroboros_search_cache::cache::{CacheConfig, CacheEntry, CacheKey, SearchResultCache, SearchResults};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let config = CacheConfig::builder()
//!     .ttl(Duration::from_secs(300))
//!     .max_memory_bytes(100 * 1024 * 1024)
//!     .build();
//!
//! let cache = SearchResultCache::new(config);
//! let key = CacheKey::builder("where is the tokenizer").scope("/work/project").build();
//!
//! if cache.get(&key).await.is_none() {
//!     let results = SearchResults::new(vec!["src/lexer.rs".to_string()], vec![0.92]);
//!     cache.put(key.clone(), CacheEntry::new(results)).await;
//! }
//!
//! let entry = cache.get(&key).await.unwrap();
//! assert_eq!(entry.document_ids()[0], "src/lexer.rs");
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod entry;
pub mod freshness;
pub mod invalidation;
pub mod key;
pub mod refresh;
pub mod store;
pub mod types;

pub use backend::{CachedSearch, CommandBackend, SearchBackend, SearchOutcome};
pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::{CacheEntry, SearchResults};
pub use invalidation::InvalidationReason;
pub use key::{CacheKey, CacheKeyBuilder};
pub use refresh::{BackgroundRefresher, CycleReport, RefreshStats, RefresherState};
pub use store::SearchResultCache;
pub use types::CacheStats;
