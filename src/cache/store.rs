//! Search result cache with TTL expiry and memory-bounded LRU eviction

use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    invalidation::{self, InvalidationReason},
    key::CacheKey,
    types::CacheStats,
};
use lru::LruCache;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Bounded, concurrent map from search fingerprints to cached results
///
/// This implementation provides:
/// - A single async mutex guarding the map, recency order and counters
/// - Lazy TTL expiry on lookup
/// - LRU eviction whenever the accounted size exceeds the memory budget,
///   never evicting the entry that was just written
/// - Scope and file based invalidation
///
/// The lock is only held for in-memory work; filesystem probes and search
/// backends always run outside it. Share one instance behind an `Arc`.
pub struct SearchResultCache {
    config: CacheConfig,
    store: Mutex<CacheStore>,
}

/// Internal cache storage
struct CacheStore {
    /// Entries in recency order (front = most recently used)
    entries: LruCache<CacheKey, CacheEntry>,

    /// Cumulative counters
    stats: CacheStats,

    /// Accounted size of all entries
    current_size_bytes: usize,
}

impl CacheStore {
    fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
            stats: CacheStats::default(),
            current_size_bytes: 0,
        }
    }

    /// Insert at the MRU position, then shrink to the budget from the LRU end
    fn insert(&mut self, key: CacheKey, entry: CacheEntry, max_memory_bytes: usize) {
        let size = entry.size_bytes();
        if let Some(previous) = self.entries.put(key, entry) {
            self.current_size_bytes = self
                .current_size_bytes
                .saturating_sub(previous.size_bytes());
        }
        self.current_size_bytes += size;

        while self.current_size_bytes > max_memory_bytes && self.entries.len() > 1 {
            let Some((evicted_key, evicted)) = self.entries.pop_lru() else {
                break;
            };
            self.current_size_bytes = self
                .current_size_bytes
                .saturating_sub(evicted.size_bytes());
            self.stats.evictions += 1;
            self.stats.memory_evictions += 1;
            debug!(
                "Evicted cache entry ({}): {}",
                InvalidationReason::MemoryBudget,
                evicted_key
            );
        }
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.current_size_bytes = self.current_size_bytes.saturating_sub(entry.size_bytes());
        Some(entry)
    }

    /// Remove every entry matching `predicate`, returning how many went
    fn remove_where(&mut self, predicate: impl Fn(&CacheKey, &CacheEntry) -> bool) -> usize {
        let doomed: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(key, entry)| predicate(*key, *entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }
}

impl SearchResultCache {
    /// Create a new cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        info!(
            "Initializing search result cache (ttl: {:?}, budget: {} bytes)",
            config.ttl, config.max_memory_bytes
        );

        Self {
            config,
            store: Mutex::new(CacheStore::new()),
        }
    }

    /// Configuration this cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a fresh entry
    ///
    /// A hit moves the entry to the most-recently-used position and records
    /// the access; the returned value is a snapshot taken after that update.
    /// An expired entry is removed and reported as a miss.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        let fresh = match store.entries.peek(key) {
            None => {
                store.stats.misses += 1;
                debug!("Cache miss: {}", key);
                return None;
            }
            Some(entry) => entry.is_fresh(self.config.ttl),
        };

        if !fresh {
            store.remove(key);
            store.stats.ttl_evictions += 1;
            store.stats.misses += 1;
            debug!("Cache entry expired ({}): {}", InvalidationReason::Expired, key);
            return None;
        }

        let entry = store.entries.get_mut(key)?;
        entry.mark_accessed();
        let snapshot = entry.clone();
        store.stats.hits += 1;

        debug!("Cache hit: {} (accesses: {})", key, snapshot.access_count);
        Some(snapshot)
    }

    /// Read an entry without recording an access or changing recency
    pub async fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        let store = self.store.lock().await;
        store.entries.peek(key).cloned()
    }

    /// Store an entry, replacing any previous one at `key`
    ///
    /// After inserting, least-recently-used entries are evicted one at a time
    /// until the accounted size fits the budget or only this entry remains.
    pub async fn put(&self, key: CacheKey, entry: CacheEntry) {
        let mut store = self.store.lock().await;
        debug!("Storing cache entry: {} ({} results)", key, entry.result_count);
        store.insert(key, entry, self.config.max_memory_bytes);
    }

    /// Replace an entry only if `key` is still cached
    ///
    /// Returns `false` (and drops `entry`) when the key was evicted or
    /// invalidated in the meantime.
    pub async fn refresh(&self, key: CacheKey, entry: CacheEntry) -> bool {
        let mut store = self.store.lock().await;
        if !store.entries.contains(&key) {
            debug!("Skipping refresh of entry no longer cached: {}", key);
            return false;
        }
        store.insert(key, entry, self.config.max_memory_bytes);
        true
    }

    /// Remove a specific entry from the cache
    pub async fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut store = self.store.lock().await;
        let removed = store.remove(key);
        if removed.is_some() {
            store.stats.invalidations += 1;
            debug!("Removed cache entry ({}): {}", InvalidationReason::Manual, key);
        }
        removed
    }

    /// Check if a key is cached (without updating access time or recency)
    pub async fn contains_key(&self, key: &CacheKey) -> bool {
        let store = self.store.lock().await;
        store.entries.contains(key)
    }

    /// Clear all entries; cumulative counters are kept
    pub async fn clear(&self) {
        let mut store = self.store.lock().await;

        let count = store.entries.len();
        store.entries.clear();
        store.current_size_bytes = 0;
        store.stats.invalidations += count as u64;

        info!(
            "Removed {} entries from cache ({})",
            count,
            InvalidationReason::Cleared
        );
    }

    /// Remove every entry whose scope equals or is nested under `scope`
    ///
    /// Relative scopes (on keys or in the argument) are compared as paths
    /// under the current working directory. An empty scope matches nothing.
    pub async fn invalidate_scope(&self, scope: &str) -> usize {
        let base = invalidation::working_dir();
        let Some(root) = invalidation::absolute_scope(Path::new(scope), &base) else {
            warn!("Ignoring invalidation of an empty scope");
            return 0;
        };

        let mut store = self.store.lock().await;
        let removed = store.remove_where(|key, _| {
            invalidation::is_within_scope(key.scope(), &root, &base)
        });
        store.stats.invalidations += removed as u64;

        info!(
            "Invalidated {} entries ({})",
            removed,
            InvalidationReason::ScopeChanged {
                scope: scope.to_string()
            }
        );
        removed
    }

    /// Invalidate entries affected by a change to `file_path`
    ///
    /// The affected scope is the enclosing version-control root if one exists,
    /// else the file's directory. Entries scoped at or below it are removed,
    /// as are entries whose scope contains the file. Relative key scopes are
    /// resolved against the current working directory.
    pub async fn invalidate_file(&self, file_path: impl AsRef<Path>) -> usize {
        let file_path = file_path.as_ref();
        let resolved = invalidation::resolve_path(file_path).await;
        let scope = invalidation::scope_for_file(&resolved).await;
        let base = invalidation::working_dir();

        let mut store = self.store.lock().await;
        let removed = store.remove_where(|key, _| {
            scope
                .as_deref()
                .is_some_and(|root| invalidation::is_within_scope(key.scope(), root, &base))
                || invalidation::scope_contains(key.scope(), &resolved, &base)
        });
        store.stats.invalidations += removed as u64;
        drop(store);

        match &scope {
            Some(root) => info!(
                "Invalidated {} entries under {} ({})",
                removed,
                root.display(),
                InvalidationReason::FileChanged {
                    path: file_path.display().to_string()
                }
            ),
            None => warn!(
                "Could not determine scope for file: {} ({} entries invalidated)",
                file_path.display(),
                removed
            ),
        }
        removed
    }

    /// Eagerly drop every expired entry, returning how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let ttl = self.config.ttl;
        let mut store = self.store.lock().await;

        let removed = store.remove_where(|_, entry| !entry.is_fresh(ttl));
        store.stats.ttl_evictions += removed as u64;

        if removed > 0 {
            debug!("Cleaned up {} expired entries", removed);
        }
        removed
    }

    /// Keys whose entry has been read at least `threshold` times
    pub async fn hot_keys(&self, threshold: u64) -> Vec<CacheKey> {
        let store = self.store.lock().await;
        store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_hot(threshold))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Get a snapshot of the cache statistics
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.lock().await;
        CacheStats {
            entries: store.entries.len(),
            total_size_bytes: store.current_size_bytes,
            ..store.stats.clone()
        }
    }

    /// Get current accounted size in bytes
    pub async fn size_bytes(&self) -> usize {
        let store = self.store.lock().await;
        store.current_size_bytes
    }

    /// Get number of entries in cache
    pub async fn len(&self) -> usize {
        let store = self.store.lock().await;
        store.entries.len()
    }

    /// Check if cache is empty
    pub async fn is_empty(&self) -> bool {
        let store = self.store.lock().await;
        store.entries.is_empty()
    }

    /// Keys from least to most recently used
    pub async fn keys_by_recency(&self) -> Vec<CacheKey> {
        let store = self.store.lock().await;
        store.entries.iter().rev().map(|(key, _)| key.clone()).collect()
    }
}

impl Default for SearchResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
