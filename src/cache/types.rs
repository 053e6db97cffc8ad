//! Statistics snapshot for cache monitoring

use serde::{Deserialize, Serialize};
use std::fmt;

/// Point-in-time copy of the cache counters
///
/// Counters are cumulative over the cache's lifetime; `clear()` empties the
/// cache but does not reset them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Successful fresh lookups
    pub hits: u64,

    /// Lookups that found nothing or found an expired entry
    pub misses: u64,

    /// Entries evicted to honor the memory budget
    pub evictions: u64,

    /// Entries dropped because they outlived the TTL
    pub ttl_evictions: u64,

    /// Memory-budget evictions (the source of `evictions`)
    pub memory_evictions: u64,

    /// Entries removed by clear, remove, or scope/file invalidation
    pub invalidations: u64,

    /// Number of entries currently cached
    pub entries: usize,

    /// Accounted size of all cached entries
    pub total_size_bytes: usize,
}

impl CacheStats {
    /// Fraction of lookups served from cache (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total lookups recorded
    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Evictions for any reason
    pub fn total_evictions(&self) -> u64 {
        self.evictions + self.ttl_evictions
    }

    /// Accounted size in MiB
    pub fn memory_mb(&self) -> f64 {
        self.total_size_bytes as f64 / (1024.0 * 1024.0)
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, size: {} bytes, evictions: {}, ttl_evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.entries,
            self.total_size_bytes,
            self.evictions,
            self.ttl_evictions
        )
    }
}
