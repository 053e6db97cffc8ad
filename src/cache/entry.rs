//! Cached search results with freshness and access metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed per-entry overhead used by the memory accounting
pub const ENTRY_OVERHEAD_BYTES: usize = 200;

/// Result identifiers with their parallel relevance scores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Document identifiers (typically file paths)
    pub document_ids: Vec<String>,

    /// Relevance score for each identifier
    pub relevance_scores: Vec<f64>,
}

impl SearchResults {
    pub fn new(document_ids: Vec<String>, relevance_scores: Vec<f64>) -> Self {
        Self {
            document_ids,
            relevance_scores,
        }
    }

    pub fn len(&self) -> usize {
        self.document_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document_ids.is_empty()
    }
}

/// A cached search result
///
/// Owned by the cache once stored: lookups hand out snapshots, and every hit
/// updates `access_count` and `last_accessed` on the stored copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached payload
    pub results: SearchResults,

    /// When the entry was produced
    pub created_at: DateTime<Utc>,

    /// Last successful lookup
    pub last_accessed: DateTime<Utc>,

    /// Number of successful lookups
    pub access_count: u64,

    /// Corpus modification time when the entry was captured
    pub scope_mtime: Option<DateTime<Utc>>,

    /// Index modification time when the entry was captured
    pub index_mtime: Option<DateTime<Utc>>,

    /// How long the search that produced this entry took
    pub search_latency: Duration,

    /// Number of results
    pub result_count: usize,
}

impl CacheEntry {
    /// Create a new entry captured now, with no accesses recorded
    pub fn new(results: SearchResults) -> Self {
        let now = Utc::now();
        let result_count = results.len();

        Self {
            results,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            scope_mtime: None,
            index_mtime: None,
            search_latency: Duration::ZERO,
            result_count,
        }
    }

    /// Record the corpus and index modification times seen at capture
    pub fn with_freshness(
        mut self,
        scope_mtime: Option<DateTime<Utc>>,
        index_mtime: Option<DateTime<Utc>>,
    ) -> Self {
        self.scope_mtime = scope_mtime;
        self.index_mtime = index_mtime;
        self
    }

    /// Record how long the backend took
    pub fn with_search_latency(mut self, latency: Duration) -> Self {
        self.search_latency = latency;
        self
    }

    /// Seed the access count
    pub fn with_access_count(mut self, access_count: u64) -> Self {
        self.access_count = access_count;
        self
    }

    pub fn document_ids(&self) -> &[String] {
        &self.results.document_ids
    }

    pub fn relevance_scores(&self) -> &[f64] {
        &self.results.relevance_scores
    }

    /// Whether the entry is younger than `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }

    /// Whether the entry has been read at least `threshold` times
    pub fn is_hot(&self, threshold: u64) -> bool {
        self.access_count >= threshold
    }

    /// Approximate memory footprint used for eviction budgeting
    pub fn size_bytes(&self) -> usize {
        let ids: usize = self.results.document_ids.iter().map(String::len).sum();
        ids + self.results.relevance_scores.len() * std::mem::size_of::<f64>()
            + ENTRY_OVERHEAD_BYTES
    }

    /// Mark the entry as accessed (updates access time and count)
    pub fn mark_accessed(&mut self) {
        self.last_accessed = Utc::now();
        self.access_count += 1;
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Get time since last access
    pub fn time_since_access(&self) -> Duration {
        (Utc::now() - self.last_accessed)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}
