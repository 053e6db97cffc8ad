//! Configuration for the search result cache and its refresher

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable overriding the TTL (seconds)
pub const ENV_TTL_SECONDS: &str = "SEARCH_CACHE_TTL_SECONDS";

/// Environment variable overriding the memory budget (bytes)
pub const ENV_MAX_MEMORY_BYTES: &str = "SEARCH_CACHE_MAX_MEMORY_BYTES";

/// Environment variable overriding the refresh interval (seconds)
pub const ENV_REFRESH_INTERVAL_SECONDS: &str = "SEARCH_CACHE_REFRESH_INTERVAL_SECONDS";

/// Environment variable overriding the hot threshold (accesses)
pub const ENV_HOT_THRESHOLD: &str = "SEARCH_CACHE_HOT_THRESHOLD";

/// Configuration for the search result cache
///
/// Defaults: 5 minute TTL, 100 MiB budget, refresh every minute, and an
/// entry counts as hot after 5 reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry staleness window
    pub ttl: Duration,

    /// Eviction budget in accounted bytes
    pub max_memory_bytes: usize,

    /// How often the background refresher scans for hot entries
    pub refresh_interval: Duration,

    /// Access count at which an entry qualifies for background refresh
    pub hot_threshold: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_memory_bytes: 100 * 1024 * 1024,
            refresh_interval: Duration::from_secs(60),
            hot_threshold: 5,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(CacheError::ConfigError(
                "ttl must be greater than 0".to_string(),
            ));
        }

        if self.max_memory_bytes == 0 {
            return Err(CacheError::ConfigError(
                "max_memory_bytes must be greater than 0".to_string(),
            ));
        }

        if self.refresh_interval.is_zero() {
            return Err(CacheError::ConfigError(
                "refresh_interval must be greater than 0".to_string(),
            ));
        }

        if self.hot_threshold == 0 {
            return Err(CacheError::ConfigError(
                "hot_threshold must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// Unset variables keep their defaults; malformed values are an error.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();

        if let Some(secs) = parse_var::<u64>(&lookup, ENV_TTL_SECONDS)? {
            builder = builder.ttl(Duration::from_secs(secs));
        }
        if let Some(bytes) = parse_var::<usize>(&lookup, ENV_MAX_MEMORY_BYTES)? {
            builder = builder.max_memory_bytes(bytes);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_REFRESH_INTERVAL_SECONDS)? {
            builder = builder.refresh_interval(Duration::from_secs(secs));
        }
        if let Some(threshold) = parse_var::<u64>(&lookup, ENV_HOT_THRESHOLD)? {
            builder = builder.hot_threshold(threshold);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            CacheError::ConfigError(format!("{} has invalid value {:?}", name, raw))
        }),
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    ttl: Option<Duration>,
    max_memory_bytes: Option<usize>,
    refresh_interval: Option<Duration>,
    hot_threshold: Option<u64>,
}

impl CacheConfigBuilder {
    /// Set the entry time-to-live
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the memory budget in bytes
    pub fn max_memory_bytes(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }

    /// Set the background refresh cadence
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Set the access count at which an entry is hot
    pub fn hot_threshold(mut self, threshold: u64) -> Self {
        self.hot_threshold = Some(threshold);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            ttl: self.ttl.unwrap_or(defaults.ttl),
            max_memory_bytes: self.max_memory_bytes.unwrap_or(defaults.max_memory_bytes),
            refresh_interval: self.refresh_interval.unwrap_or(defaults.refresh_interval),
            hot_threshold: self.hot_threshold.unwrap_or(defaults.hot_threshold),
        }
    }
}

/// Preset configurations for common use cases
impl CacheConfig {
    /// Memory-constrained environments
    pub fn small() -> Self {
        Self {
            max_memory_bytes: 10 * 1024 * 1024,
            ..Default::default()
        }
    }

    /// Rapidly changing corpora: short TTL, aggressive refresh
    pub fn realtime() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            refresh_interval: Duration::from_secs(15),
            hot_threshold: 3,
            ..Default::default()
        }
    }
}
