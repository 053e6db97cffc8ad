//! Freshness probes captured alongside cached results
//!
//! Entries record the corpus and index modification times observed when they
//! were produced, so callers can tell whether the underlying data moved on.

use chrono::{DateTime, Utc};
use std::path::Path;

/// Index directory (relative to the scope) checked by default
pub const DEFAULT_INDEX_DIR: &str = ".cache/chroma";

async fn mtime(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

/// Modification time of the scope root, `None` if it does not exist
pub async fn scope_mtime(scope: &str) -> Option<DateTime<Utc>> {
    mtime(Path::new(scope)).await
}

/// Modification time of the search index under `scope`
pub async fn index_mtime(scope: &str, index_dir: &str) -> Option<DateTime<Utc>> {
    mtime(&Path::new(scope).join(index_dir)).await
}

/// Both freshness inputs for `scope`, using the default index location
pub async fn capture(scope: &str) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (
        scope_mtime(scope).await,
        index_mtime(scope, DEFAULT_INDEX_DIR).await,
    )
}
