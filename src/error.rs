//! Error types for cache operations
//!
//! A cache miss is never an error: lookups return `Option`. The variants here
//! cover failures of the search backend, configuration problems and a
//! background worker that could not be stopped in time.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the search cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// The search/refresh callback reported a failure
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// The background worker did not exit within the requested timeout
    #[error("Background refresher did not stop within {timeout:?}")]
    ShutdownTimeout { timeout: Duration },

    /// The background worker terminated abnormally (panic or abort)
    #[error("Background refresher failed: {0}")]
    WorkerFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// External search command exited unsuccessfully
    #[error("Command `{program}` failed with status {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: i32,
        stderr: String,
    },

    /// I/O error while probing the filesystem or spawning a backend
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    /// Whether this error came from the search backend rather than the cache itself
    pub fn is_search_failure(&self) -> bool {
        matches!(
            self,
            CacheError::SearchFailed(_) | CacheError::CommandFailed { .. } | CacheError::Io(_)
        )
    }
}

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}
