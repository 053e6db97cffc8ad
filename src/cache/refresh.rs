//! Background refresh of frequently requested entries
//!
//! A [`BackgroundRefresher`] owns one tokio task that sleeps for the refresh
//! interval, then recomputes every hot entry through a [`SearchBackend`] and
//! writes the new results back. The cache lock is only taken to enumerate hot
//! keys and to store each refreshed entry; callbacks always run outside it.

use crate::cache::{
    backend::SearchBackend, entry::CacheEntry, freshness, key::CacheKey,
    store::SearchResultCache,
};
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of a refresher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefresherState {
    /// Constructed, worker not yet launched
    Created,

    /// Worker launched
    Running,

    /// Worker joined after `stop`
    Stopped,
}

/// Cumulative refresh counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshStats {
    /// Completed scan cycles
    pub cycles: u64,

    /// Entries successfully recomputed and written back
    pub refreshed: u64,

    /// Callback failures (errors or panics)
    pub failed: u64,
}

/// Outcome of a single refresh pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub hot_keys: usize,
    pub refreshed: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct RefreshCounters {
    cycles: AtomicU64,
    refreshed: AtomicU64,
    failed: AtomicU64,
}

impl RefreshCounters {
    fn snapshot(&self) -> RefreshStats {
        RefreshStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            refreshed: self.refreshed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Proactively recomputes hot cache entries
///
/// `start()` launches exactly one worker; `stop(timeout)` signals it and
/// waits. A callback already in flight is allowed to finish, after which the
/// worker exits without sleeping again. Dropping a running refresher closes
/// the shutdown channel, which the worker treats as a stop request.
pub struct BackgroundRefresher {
    cache: Arc<SearchResultCache>,
    callback: Arc<dyn SearchBackend>,
    interval: Duration,
    hot_threshold: u64,
    state: RefresherState,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
    counters: Arc<RefreshCounters>,
}

impl BackgroundRefresher {
    /// Create a refresher for `cache` driven by `callback`
    pub fn new(
        cache: Arc<SearchResultCache>,
        callback: impl SearchBackend + 'static,
        interval: Duration,
        hot_threshold: u64,
    ) -> Self {
        Self::with_shared(cache, Arc::new(callback), interval, hot_threshold)
    }

    /// Create a refresher using the cadence and threshold from the cache config
    pub fn from_config(cache: Arc<SearchResultCache>, callback: impl SearchBackend + 'static) -> Self {
        let interval = cache.config().refresh_interval;
        let hot_threshold = cache.config().hot_threshold;
        Self::new(cache, callback, interval, hot_threshold)
    }

    /// Create a refresher sharing an already-boxed callback
    pub fn with_shared(
        cache: Arc<SearchResultCache>,
        callback: Arc<dyn SearchBackend>,
        interval: Duration,
        hot_threshold: u64,
    ) -> Self {
        Self {
            cache,
            callback,
            interval,
            hot_threshold,
            state: RefresherState::Created,
            shutdown: None,
            handle: None,
            counters: Arc::new(RefreshCounters::default()),
        }
    }

    pub fn state(&self) -> RefresherState {
        self.state
    }

    /// Whether a worker task is alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn stats(&self) -> RefreshStats {
        self.counters.snapshot()
    }

    /// Launch the worker
    ///
    /// Must be called from within a tokio runtime, and the interval must be
    /// non-zero (`ConfigError` otherwise). Starting a refresher that
    /// is already running logs a warning and does nothing; a stopped
    /// refresher can be started again.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            warn!("Background refresher already running");
            return Ok(());
        }

        if self.interval.is_zero() {
            return Err(CacheError::ConfigError(
                "refresh_interval must be greater than 0".to_string(),
            ));
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            CacheError::WorkerFailed(format!("no tokio runtime to run refresher: {}", e))
        })?;

        let (tx, rx) = watch::channel(false);
        let worker = RefreshWorker {
            cache: Arc::clone(&self.cache),
            callback: Arc::clone(&self.callback),
            hot_threshold: self.hot_threshold,
            counters: Arc::clone(&self.counters),
        };
        let interval = self.interval;

        self.handle = Some(runtime.spawn(worker.run(interval, rx)));
        self.shutdown = Some(tx);
        self.state = RefresherState::Running;

        info!(
            "Background refresher started (interval: {:?}, hot threshold: {})",
            self.interval, self.hot_threshold
        );
        Ok(())
    }

    /// Signal the worker to stop and wait up to `timeout` for it to exit
    ///
    /// Returns `ShutdownTimeout` if the worker is still busy (typically inside
    /// a slow callback) when the timeout elapses; the stop request stays in
    /// effect and `stop` may be called again to keep waiting.
    pub async fn stop(&mut self, timeout: Duration) -> Result<()> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };

        if let Some(tx) = &self.shutdown {
            tx.send_replace(true);
        }

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => {
                self.finish();
                info!("Background refresher stopped");
                Ok(())
            }
            Ok(Err(join_error)) => {
                self.finish();
                error!("Background refresher terminated abnormally: {}", join_error);
                Err(CacheError::WorkerFailed(join_error.to_string()))
            }
            Err(_) => {
                warn!("Background refresher did not stop within {:?}", timeout);
                self.handle = Some(handle);
                Err(CacheError::ShutdownTimeout { timeout })
            }
        }
    }

    /// Run one refresh pass immediately on the caller's task
    pub async fn run_cycle(&self) -> CycleReport {
        let worker = RefreshWorker {
            cache: Arc::clone(&self.cache),
            callback: Arc::clone(&self.callback),
            hot_threshold: self.hot_threshold,
            counters: Arc::clone(&self.counters),
        };
        worker.run_cycle(|| false).await
    }

    fn finish(&mut self) {
        self.shutdown = None;
        self.state = RefresherState::Stopped;
    }
}

struct RefreshWorker {
    cache: Arc<SearchResultCache>,
    callback: Arc<dyn SearchBackend>,
    hot_threshold: u64,
    counters: Arc<RefreshCounters>,
}

/// Stop requested, or the refresher (and its sender) is gone
fn stop_requested(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow() || rx.has_changed().is_err()
}

impl RefreshWorker {
    async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        debug!("Refresh worker running");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            if stop_requested(&shutdown) {
                break;
            }

            self.run_cycle(|| stop_requested(&shutdown)).await;

            if stop_requested(&shutdown) {
                break;
            }
        }

        debug!("Refresh worker exiting");
    }

    async fn run_cycle(&self, cancelled: impl Fn() -> bool) -> CycleReport {
        let hot_keys = self.cache.hot_keys(self.hot_threshold).await;
        let mut report = CycleReport {
            hot_keys: hot_keys.len(),
            ..Default::default()
        };

        if !hot_keys.is_empty() {
            debug!("Refreshing {} hot queries", hot_keys.len());
        }

        for key in hot_keys {
            if cancelled() {
                debug!("Refresh cycle interrupted by shutdown");
                break;
            }

            match self.refresh_key(&key).await {
                Ok(true) => {
                    report.refreshed += 1;
                    self.counters.refreshed.fetch_add(1, Ordering::Relaxed);
                    debug!("Refreshed hot query: {}", key.short_query());
                }
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!("Failed to refresh key {}: {}", key.short_query(), e);
                }
            }
        }

        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        report
    }

    /// Recompute one key; `Ok(false)` if it left the cache meanwhile
    async fn refresh_key(&self, key: &CacheKey) -> Result<bool> {
        let callback = Arc::clone(&self.callback);
        let owned_key = key.clone();
        let start = Instant::now();

        // A panicking callback surfaces as a JoinError instead of killing the worker
        let results = tokio::spawn(async move { callback.search(&owned_key).await })
            .await
            .map_err(|e| CacheError::SearchFailed(format!("refresh callback panicked: {}", e)))??;
        let latency = start.elapsed();

        let (scope_mtime, index_mtime) = freshness::capture(key.scope()).await;
        // Fresh lifecycle: the refreshed entry must earn hotness again
        let entry = CacheEntry::new(results)
            .with_freshness(scope_mtime, index_mtime)
            .with_search_latency(latency);

        Ok(self.cache.refresh(key.clone(), entry).await)
    }
}
