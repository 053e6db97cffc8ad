//! Search fingerprints used as cache keys

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Default scope when the caller does not name one
pub const DEFAULT_SCOPE: &str = ".";

/// Default result-size cap (tokens of context returned by the backend)
pub const DEFAULT_MAX_RESULTS: usize = 3000;

/// Default embedding model identifier
pub const DEFAULT_MODEL_ID: &str = "modernbert";

/// Default index format version
pub const DEFAULT_INDEX_VERSION: &str = "v1";

/// Immutable fingerprint of a search plus the configuration that shapes its result
///
/// Two keys are equal iff every field is equal. The query is normalized
/// (trimmed, lower-cased) before it is stored and hashed, so `"  Rust LRU "`
/// and `"rust lru"` produce the same key.
#[derive(Debug, Clone, Serialize)]
pub struct CacheKey {
    query: String,
    query_hash: String,
    scope: String,
    scope_only: bool,
    max_results: usize,
    min_relevance: f64,
    model_id: String,
    index_version: String,
}

impl CacheKey {
    /// Build a key from search parameters, normalizing the query
    pub fn from_search(
        query: &str,
        scope: impl Into<String>,
        scope_only: bool,
        max_results: usize,
        min_relevance: f64,
        model_id: impl Into<String>,
        index_version: impl Into<String>,
    ) -> Self {
        let query = normalize_query(query);
        let query_hash = hash_query(&query);

        Self {
            query,
            query_hash,
            scope: scope.into(),
            scope_only,
            max_results,
            // -0.0 and 0.0 compare equal but differ bitwise
            min_relevance: if min_relevance == 0.0 { 0.0 } else { min_relevance },
            model_id: model_id.into(),
            index_version: index_version.into(),
        }
    }

    /// Start a builder populated with the default search configuration
    pub fn builder(query: impl Into<String>) -> CacheKeyBuilder {
        CacheKeyBuilder::new(query)
    }

    /// Normalized query text
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Hex SHA-256 of the normalized query
    pub fn query_hash(&self) -> &str {
        &self.query_hash
    }

    /// Scope (workspace/corpus path) the search ran against
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn scope_only(&self) -> bool {
        self.scope_only
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn min_relevance(&self) -> f64 {
        self.min_relevance
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn index_version(&self) -> &str {
        &self.index_version
    }

    /// Query truncated for log lines
    pub fn short_query(&self) -> &str {
        match self.query.char_indices().nth(50) {
            Some((idx, _)) => &self.query[..idx],
            None => &self.query,
        }
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.query_hash == other.query_hash
            && self.query == other.query
            && self.scope == other.scope
            && self.scope_only == other.scope_only
            && self.max_results == other.max_results
            && self.min_relevance.to_bits() == other.min_relevance.to_bits()
            && self.model_id == other.model_id
            && self.index_version == other.index_version
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.query_hash.hash(state);
        self.query.hash(state);
        self.scope.hash(state);
        self.scope_only.hash(state);
        self.max_results.hash(state);
        self.min_relevance.to_bits().hash(state);
        self.model_id.hash(state);
        self.index_version.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} [{}]",
            self.short_query(),
            self.scope,
            &self.query_hash[..12]
        )
    }
}

/// Builder for cache keys with the defaults used by the search tool
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    query: String,
    scope: String,
    scope_only: bool,
    max_results: usize,
    min_relevance: f64,
    model_id: String,
    index_version: String,
}

impl CacheKeyBuilder {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            scope: DEFAULT_SCOPE.to_string(),
            scope_only: true,
            max_results: DEFAULT_MAX_RESULTS,
            min_relevance: 0.0,
            model_id: DEFAULT_MODEL_ID.to_string(),
            index_version: DEFAULT_INDEX_VERSION.to_string(),
        }
    }

    /// Set the scope path
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Restrict the search to the scope
    pub fn scope_only(mut self, scope_only: bool) -> Self {
        self.scope_only = scope_only;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn min_relevance(mut self, min_relevance: f64) -> Self {
        self.min_relevance = min_relevance;
        self
    }

    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn index_version(mut self, index_version: impl Into<String>) -> Self {
        self.index_version = index_version.into();
        self
    }

    /// Build the key
    pub fn build(self) -> CacheKey {
        CacheKey::from_search(
            &self.query,
            self.scope,
            self.scope_only,
            self.max_results,
            self.min_relevance,
            self.model_id,
            self.index_version,
        )
    }
}

/// Lower-case and trim a query so equivalent searches collide
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

fn hash_query(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}
