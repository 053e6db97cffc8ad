//! Scope-based invalidation
//!
//! Cached entries are not tied to the individual documents they reference,
//! so a content change invalidates conservatively by scope: every entry whose
//! scope equals or is nested under the changed root is dropped. For a single
//! changed file the root is the enclosing version-control checkout when one
//! can be found, otherwise the file's directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory markers that identify a version-control root
pub const VCS_MARKERS: &[&str] = &[".git", ".hg", ".jj"];

/// Why an entry left the cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// Entry outlived the TTL
    Expired,

    /// Evicted to stay within the memory budget
    MemoryBudget,

    /// Scope (or an ancestor of it) was invalidated
    ScopeChanged { scope: String },

    /// A file inside the scope changed
    FileChanged { path: String },

    /// Removed explicitly by key
    Manual,

    /// Whole cache cleared
    Cleared,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::Expired => write!(f, "TTL expired"),
            InvalidationReason::MemoryBudget => write!(f, "memory budget exceeded"),
            InvalidationReason::ScopeChanged { scope } => write!(f, "scope changed: {}", scope),
            InvalidationReason::FileChanged { path } => write!(f, "file changed: {}", path),
            InvalidationReason::Manual => write!(f, "manual invalidation"),
            InvalidationReason::Cleared => write!(f, "cache cleared"),
        }
    }
}

/// Directory relative scopes are resolved against
///
/// Falls back to an empty path (leaving relative scopes relative) when the
/// working directory cannot be read.
pub fn working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_default()
}

/// Absolute form of `scope`, joined onto `base` when relative
///
/// Purely lexical. An empty scope names no directory and yields `None`.
pub fn absolute_scope(scope: &Path, base: &Path) -> Option<PathBuf> {
    if scope.as_os_str().is_empty() {
        return None;
    }
    if scope.is_absolute() {
        Some(scope.to_path_buf())
    } else {
        Some(base.join(scope))
    }
}

/// Whether `scope` equals `root` or is nested under it (component-wise)
///
/// Relative paths on either side resolve against `base`; empty paths match
/// nothing.
pub fn is_within_scope(scope: &str, root: &Path, base: &Path) -> bool {
    match (
        absolute_scope(Path::new(scope), base),
        absolute_scope(root, base),
    ) {
        (Some(scope), Some(root)) => scope.starts_with(root),
        _ => false,
    }
}

/// Whether `path` lies inside `scope` (component-wise)
pub fn scope_contains(scope: &str, path: &Path, base: &Path) -> bool {
    match (
        absolute_scope(Path::new(scope), base),
        absolute_scope(path, base),
    ) {
        (Some(scope), Some(path)) => path.starts_with(scope),
        _ => false,
    }
}

/// Resolve a possibly-deleted file path to an absolute path
///
/// A file-watcher may report a path that no longer exists, so when the file
/// itself cannot be canonicalized the parent directory is tried before
/// falling back to a purely lexical absolute path.
pub async fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = tokio::fs::canonicalize(path).await {
        return resolved;
    }

    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(resolved_parent) = tokio::fs::canonicalize(parent).await {
            return resolved_parent.join(name);
        }
    }

    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Find the nearest version-control root at or above `path`
pub async fn find_vcs_root(path: &Path) -> Option<PathBuf> {
    for candidate in path.ancestors() {
        for marker in VCS_MARKERS {
            if tokio::fs::try_exists(candidate.join(marker))
                .await
                .unwrap_or(false)
            {
                return Some(candidate.to_path_buf());
            }
        }
    }
    None
}

/// Derive the scope affected by a change to `file_path`
///
/// Prefers the enclosing version-control root, else the containing directory.
/// `file_path` is expected to be absolute (see [`resolve_path`]).
pub async fn scope_for_file(file_path: &Path) -> Option<PathBuf> {
    if let Some(root) = find_vcs_root(file_path).await {
        return Some(root);
    }
    file_path.parent().map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_within_scope() {
        let root = Path::new("/work/project");
        let base = Path::new("/elsewhere");

        assert!(is_within_scope("/work/project", root, base));
        assert!(is_within_scope("/work/project/src", root, base));
        assert!(is_within_scope("/work/project/src/", root, base));
        assert!(!is_within_scope("/work/project-old", root, base));
        assert!(!is_within_scope("/work", root, base));
        assert!(!is_within_scope("/other/project", root, base));
    }

    #[test]
    fn test_relative_scopes_resolve_against_base() {
        let base = Path::new("/work/project");

        assert!(is_within_scope(".", Path::new("/work/project"), base));
        assert!(is_within_scope("src", Path::new("/work/project"), base));
        assert!(is_within_scope("./src/", Path::new("/work/project/src"), base));
        assert!(is_within_scope("/work/project/docs", Path::new("."), base));
        assert!(!is_within_scope(".", Path::new("/work/project/src"), base));

        assert!(scope_contains(".", Path::new("/work/project/src/lib.rs"), base));
        assert!(scope_contains("/work", Path::new("src/lib.rs"), base));
        assert!(!scope_contains("docs", Path::new("/work/project/src/lib.rs"), base));
    }

    #[test]
    fn test_empty_scope_matches_nothing() {
        let base = Path::new("/work/project");

        assert!(!is_within_scope("/work/project", Path::new(""), base));
        assert!(!is_within_scope("", Path::new("/work/project"), base));
        assert!(!scope_contains("", Path::new("/work/project/lib.rs"), base));
        assert_eq!(absolute_scope(Path::new(""), base), None);
        assert_eq!(
            absolute_scope(Path::new("."), base).as_deref(),
            Some(Path::new("/work/project/."))
        );
    }

    #[test]
    fn test_scope_contains() {
        let file = Path::new("/work/project/src/lib.rs");
        let base = Path::new("/elsewhere");

        assert!(scope_contains("/work/project", file, base));
        assert!(scope_contains("/work", file, base));
        assert!(!scope_contains("/work/project/docs", file, base));
        assert!(!scope_contains("/work/proj", file, base));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(InvalidationReason::Expired.to_string(), "TTL expired");
        assert_eq!(
            InvalidationReason::ScopeChanged {
                scope: "/ws".to_string()
            }
            .to_string(),
            "scope changed: /ws"
        );
        assert_eq!(InvalidationReason::Cleared.to_string(), "cache cleared");
    }

    #[tokio::test]
    async fn test_find_vcs_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("src/nested")).unwrap();

        let found = find_vcs_root(&root.join("src/nested/file.rs")).await;
        assert_eq!(found, Some(root.clone()));

        let scope = scope_for_file(&root.join("src/nested/file.rs")).await;
        assert_eq!(scope, Some(root));
    }

    #[tokio::test]
    async fn test_scope_falls_back_to_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("docs")).unwrap();

        // Only meaningful when no ancestor of the temp dir is a checkout
        if find_vcs_root(&root).await.is_none() {
            let scope = scope_for_file(&root.join("docs/readme.md")).await;
            assert_eq!(scope, Some(root.join("docs")));
        }
    }

    #[tokio::test]
    async fn test_resolve_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        let resolved = resolve_path(&root.join("deleted.txt")).await;
        assert_eq!(resolved, root.join("deleted.txt"));
    }
}
