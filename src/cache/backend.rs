//! Search backends and the cache-through search service
//!
//! The cache never calls a backend while holding its lock: [`CachedSearch`]
//! looks up, releases, runs the backend, then stores the result with a
//! separate `put`.

use crate::cache::{
    config::CacheConfig,
    entry::{CacheEntry, SearchResults},
    freshness,
    key::CacheKey,
    refresh::BackgroundRefresher,
    store::SearchResultCache,
};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// An expensive search that can be (re)computed for a cache key
///
/// Used both for foreground misses and as the refresh callback of
/// [`BackgroundRefresher`]. Any async closure
/// `Fn(CacheKey) -> impl Future<Output = Result<SearchResults>>` qualifies.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, key: &CacheKey) -> Result<SearchResults>;
}

#[async_trait]
impl<F, Fut> SearchBackend for F
where
    F: Fn(CacheKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<SearchResults>> + Send,
{
    async fn search(&self, key: &CacheKey) -> Result<SearchResults> {
        (self)(key.clone()).await
    }
}

/// Runs an external search CLI and caches its raw output
///
/// The command line is `<program> search <query> [<scope>] --format full
/// [--max-tokens N] [--min-relevance X]`; the scope is only passed for
/// scope-restricted keys. Stdout is stored as a single document with score 1.0.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: PathBuf,
    working_dir: Option<PathBuf>,
}

impl CommandBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
        }
    }

    /// Run the command from a fixed directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Arguments passed for `key`
    pub fn args_for(&self, key: &CacheKey) -> Vec<String> {
        let mut args = vec!["search".to_string(), key.query().to_string()];

        if key.scope_only() && !key.scope().is_empty() {
            args.push(key.scope().to_string());
        }

        args.push("--format".to_string());
        args.push("full".to_string());

        if key.max_results() > 0 {
            args.push("--max-tokens".to_string());
            args.push(key.max_results().to_string());
        }
        if key.min_relevance() > 0.0 {
            args.push("--min-relevance".to_string());
            args.push(key.min_relevance().to_string());
        }

        args
    }
}

#[async_trait]
impl SearchBackend for CommandBackend {
    async fn search(&self, key: &CacheKey) -> Result<SearchResults> {
        let mut cmd = Command::new(&self.program);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.args(self.args_for(key));

        // Close stdin so the backend cannot block waiting for input
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!("Running search command: {:?}", cmd);
        let start = Instant::now();
        let output = cmd.output().await?;
        info!(
            "Ran search `{}` for {} in {:.2}s",
            self.program.display(),
            key.short_query(),
            start.elapsed().as_secs_f64()
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("Search command failed: {}", stderr);
            return Err(CacheError::CommandFailed {
                program: self.program.display().to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(SearchResults::new(vec![stdout], vec![1.0]))
    }
}

/// Result of a cache-through search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The cached or freshly computed entry
    pub entry: CacheEntry,

    /// Whether the entry came from the cache
    pub cache_hit: bool,
}

/// Cache-through search service
///
/// Construct one at startup and pass it (or its [`cache`](Self::cache)) to
/// whatever needs search results. It owns the cache, the backend and, once
/// started, the background refresher, whose lifetime ends with
/// [`shutdown`](Self::shutdown).
pub struct CachedSearch {
    cache: Arc<SearchResultCache>,
    backend: Arc<dyn SearchBackend>,
    refresher: Option<BackgroundRefresher>,
}

impl CachedSearch {
    /// Create a service with a fresh cache built from `config`
    pub fn new(config: CacheConfig, backend: impl SearchBackend + 'static) -> Self {
        Self::with_cache(Arc::new(SearchResultCache::new(config)), Arc::new(backend))
    }

    /// Create a service around an existing cache
    pub fn with_cache(cache: Arc<SearchResultCache>, backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            cache,
            backend,
            refresher: None,
        }
    }

    /// Shared handle to the underlying cache
    pub fn cache(&self) -> &Arc<SearchResultCache> {
        &self.cache
    }

    /// The background refresher, if one was started
    pub fn refresher(&self) -> Option<&BackgroundRefresher> {
        self.refresher.as_ref()
    }

    /// Return cached results for `key`, running the backend on a miss
    ///
    /// Backend failures propagate to the caller and leave the cache untouched.
    pub async fn search(&self, key: &CacheKey) -> Result<SearchOutcome> {
        if let Some(entry) = self.cache.get(key).await {
            info!("Search cache hit for query: {}", key.short_query());
            return Ok(SearchOutcome {
                entry,
                cache_hit: true,
            });
        }

        info!("Search cache miss for query: {}", key.short_query());
        let start = Instant::now();
        let results = self.backend.search(key).await?;
        let latency = start.elapsed();

        let (scope_mtime, index_mtime) = freshness::capture(key.scope()).await;
        // The miss itself counts as the first access
        let entry = CacheEntry::new(results)
            .with_freshness(scope_mtime, index_mtime)
            .with_search_latency(latency)
            .with_access_count(1);

        self.cache.put(key.clone(), entry.clone()).await;

        Ok(SearchOutcome {
            entry,
            cache_hit: false,
        })
    }

    /// Start refreshing hot entries in the background using this backend
    ///
    /// Cadence and threshold come from the cache configuration. Calling this
    /// while a refresher is already running has no effect.
    pub fn start_refresher(&mut self) -> Result<()> {
        let config = self.cache.config().clone();
        let refresher = self.refresher.get_or_insert_with(|| {
            BackgroundRefresher::with_shared(
                Arc::clone(&self.cache),
                Arc::clone(&self.backend),
                config.refresh_interval,
                config.hot_threshold,
            )
        });
        refresher.start()
    }

    /// Stop the background refresher, waiting up to `timeout`
    pub async fn shutdown(&mut self, timeout: Duration) -> Result<()> {
        match self.refresher.as_mut() {
            Some(refresher) => refresher.stop(timeout).await,
            None => Ok(()),
        }
    }
}
