//! Integration tests for the search result cache
//!
//! These tests verify:
//! - Hit/miss bookkeeping and recency updates
//! - TTL expiration
//! - Memory-bounded LRU eviction
//! - Scope and file invalidation
//! - Hot key selection
//! - Concurrent access from many tasks

use futures::future::join_all;
use ouroboros_search_cache::{
    CacheConfig, CacheEntry, CacheKey, SearchResultCache, SearchResults,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn key(query: &str) -> CacheKey {
    CacheKey::builder(query).scope("/workspace").build()
}

fn scoped(query: &str, scope: &str) -> CacheKey {
    CacheKey::builder(query).scope(scope).build()
}

fn fixed_entry() -> CacheEntry {
    CacheEntry::new(SearchResults::new(
        vec!["docs/guide.md".to_string(), "src/lib.rs".to_string()],
        vec![0.9, 0.6],
    ))
}

#[tokio::test]
async fn test_put_then_get_increments_access_once() {
    let cache = SearchResultCache::new(CacheConfig::default());

    cache.put(key("q1"), fixed_entry()).await;
    cache.put(key("q2"), fixed_entry()).await;

    let hit = cache.get(&key("q1")).await.unwrap();
    assert_eq!(hit.access_count, 1);
    assert_eq!(hit.results, fixed_entry().results);
    assert!(hit.last_accessed >= hit.created_at);

    // q1 is now the most recently used
    assert_eq!(cache.keys_by_recency().await.last(), Some(&key("q1")));

    let again = cache.get(&key("q1")).await.unwrap();
    assert_eq!(again.access_count, 2);
}

#[tokio::test]
async fn test_ttl_scenario() {
    let config = CacheConfig::builder().ttl(Duration::from_secs(1)).build();
    let cache = SearchResultCache::new(config);

    cache.put(key("expiring"), fixed_entry()).await;
    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert!(cache.get(&key("expiring")).await.is_none());

    let stats = cache.stats().await;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.ttl_evictions, 1);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.entries, 0);
}

#[tokio::test]
async fn test_eviction_scenario_removes_four_oldest() {
    let entry_size = fixed_entry().size_bytes();
    let config = CacheConfig::builder()
        .max_memory_bytes(entry_size * 6)
        .build();
    let cache = SearchResultCache::new(config);

    let keys: Vec<CacheKey> = (0..10).map(|i| key(&format!("query {}", i))).collect();
    for k in &keys {
        cache.put(k.clone(), fixed_entry()).await;
    }

    for evicted in &keys[..4] {
        assert!(!cache.contains_key(evicted).await, "{} should be evicted", evicted);
    }
    for kept in &keys[4..] {
        assert!(cache.contains_key(kept).await, "{} should be cached", kept);
    }

    let stats = cache.stats().await;
    assert_eq!(stats.evictions, 4);
    assert_eq!(stats.memory_evictions, 4);
    assert_eq!(stats.entries, 6);
    assert_eq!(stats.total_size_bytes, entry_size * 6);
}

#[tokio::test]
async fn test_eviction_respects_recency_not_insertion() {
    let entry_size = fixed_entry().size_bytes();
    let config = CacheConfig::builder()
        .max_memory_bytes(entry_size * 3)
        .build();
    let cache = SearchResultCache::new(config);

    cache.put(key("a"), fixed_entry()).await;
    cache.put(key("b"), fixed_entry()).await;
    cache.put(key("c"), fixed_entry()).await;

    // Touch a so b becomes the least recently used
    cache.get(&key("a")).await.unwrap();
    cache.put(key("d"), fixed_entry()).await;

    assert!(!cache.contains_key(&key("b")).await);
    assert!(cache.contains_key(&key("a")).await);

    // Overwriting c also refreshes its position, so a goes next
    cache.put(key("c"), fixed_entry()).await;
    cache.put(key("e"), fixed_entry()).await;

    assert!(!cache.contains_key(&key("a")).await);
    assert_eq!(
        cache.keys_by_recency().await,
        vec![key("d"), key("c"), key("e")]
    );
}

#[tokio::test]
async fn test_size_never_exceeds_budget_except_single_entry() {
    let config = CacheConfig::builder().max_memory_bytes(1000).build();
    let cache = SearchResultCache::new(config);

    for i in 0..50 {
        let ids: Vec<String> = (0..(i % 7)).map(|j| format!("file-{}-{}.rs", i, j)).collect();
        let scores = vec![0.5; ids.len()];
        cache
            .put(key(&format!("q{}", i)), CacheEntry::new(SearchResults::new(ids, scores)))
            .await;

        let stats = cache.stats().await;
        assert!(stats.total_size_bytes <= 1000 || stats.entries == 1);
    }

    // One entry far larger than the budget is still retained on its own
    let huge = CacheEntry::new(SearchResults::new(vec!["x".repeat(5000)], vec![1.0]));
    cache.put(key("huge"), huge).await;
    assert_eq!(cache.len().await, 1);
    assert!(cache.contains_key(&key("huge")).await);
}

#[tokio::test]
async fn test_hot_keys_exact_set() {
    let cache = SearchResultCache::new(CacheConfig::default());

    for (i, count) in [0u64, 3, 4, 5, 9].iter().enumerate() {
        cache
            .put(key(&format!("q{}", i)), fixed_entry().with_access_count(*count))
            .await;
    }

    // q2 crosses the threshold after one more read
    cache.get(&key("q2")).await.unwrap();

    let hot: HashSet<CacheKey> = cache.hot_keys(5).await.into_iter().collect();
    let expected: HashSet<CacheKey> = [key("q2"), key("q3"), key("q4")].into_iter().collect();
    assert_eq!(hot, expected);
}

#[tokio::test]
async fn test_invalidate_scope_all_and_only() {
    let cache = SearchResultCache::new(CacheConfig::default());

    cache.put(scoped("q", "/work/app"), fixed_entry()).await;
    cache.put(scoped("q2", "/work/app"), fixed_entry()).await;
    cache.put(scoped("q", "/work/app/crates/core"), fixed_entry()).await;
    cache.put(scoped("q", "/work/application"), fixed_entry()).await;
    cache.put(scoped("q", "/work"), fixed_entry()).await;

    let removed = cache.invalidate_scope("/work/app").await;
    assert_eq!(removed, 3);

    assert!(cache.contains_key(&scoped("q", "/work/application")).await);
    assert!(cache.contains_key(&scoped("q", "/work")).await);
    assert_eq!(cache.len().await, 2);

    let stats = cache.stats().await;
    assert_eq!(stats.invalidations, 3);
    assert_eq!(stats.total_size_bytes, fixed_entry().size_bytes() * 2);
}

#[tokio::test]
async fn test_invalidate_file_uses_vcs_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let repo = root.join("repo");
    std::fs::create_dir_all(repo.join(".git")).unwrap();
    std::fs::create_dir_all(repo.join("src/parser")).unwrap();
    let file = repo.join("src/parser/mod.rs");
    std::fs::write(&file, "fn parse() {}").unwrap();

    let repo_scope = repo.to_string_lossy().to_string();
    let nested_scope = repo.join("src").to_string_lossy().to_string();
    let sibling_scope = root.join("other").to_string_lossy().to_string();

    let cache = SearchResultCache::new(CacheConfig::default());
    cache.put(scoped("q", &repo_scope), fixed_entry()).await;
    cache.put(scoped("q", &nested_scope), fixed_entry()).await;
    cache.put(scoped("q", &sibling_scope), fixed_entry()).await;

    let removed = cache.invalidate_file(&file).await;
    assert_eq!(removed, 2);
    assert!(cache.contains_key(&scoped("q", &sibling_scope)).await);
}

#[tokio::test]
async fn test_invalidate_file_without_vcs_uses_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("notes/drafts")).unwrap();
    std::fs::create_dir_all(root.join("elsewhere")).unwrap();
    let file = root.join("notes/todo.md");
    std::fs::write(&file, "- write tests").unwrap();

    let notes_scope = root.join("notes").to_string_lossy().to_string();
    let drafts_scope = root.join("notes/drafts").to_string_lossy().to_string();
    let elsewhere_scope = root.join("elsewhere").to_string_lossy().to_string();

    let cache = SearchResultCache::new(CacheConfig::default());
    cache.put(scoped("q", &notes_scope), fixed_entry()).await;
    cache.put(scoped("q", &drafts_scope), fixed_entry()).await;
    cache.put(scoped("q", &elsewhere_scope), fixed_entry()).await;

    let removed = cache.invalidate_file(&file).await;

    // Whatever the derived root, both scopes containing or under the file's
    // directory are gone and the unrelated directory survives
    assert!(removed >= 2);
    assert!(!cache.contains_key(&scoped("q", &notes_scope)).await);
    assert!(!cache.contains_key(&scoped("q", &drafts_scope)).await);
    if removed == 2 {
        assert!(cache.contains_key(&scoped("q", &elsewhere_scope)).await);
    }
}

#[tokio::test]
async fn test_invalidate_file_removes_enclosing_scope() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("corpus/deep/er")).unwrap();
    let file = root.join("corpus/deep/er/page.md");
    std::fs::write(&file, "content").unwrap();

    // The scope sits above the file's directory
    let corpus_scope = root.join("corpus").to_string_lossy().to_string();
    let cache = SearchResultCache::new(CacheConfig::default());
    cache.put(scoped("q", &corpus_scope), fixed_entry()).await;

    assert_eq!(cache.invalidate_file(&file).await, 1);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_invalidate_file_reaches_default_scope() {
    // Integration tests run from the package root, so the manifest sits in "."
    let cwd = std::env::current_dir().unwrap();
    let default_scoped = CacheKey::builder("where is the cache configured").build();
    assert_eq!(default_scoped.scope(), ".");

    let cache = SearchResultCache::new(CacheConfig::default());
    cache.put(default_scoped.clone(), fixed_entry()).await;
    cache.put(scoped("q", "/unrelated/corpus"), fixed_entry()).await;

    let removed = cache.invalidate_file("Cargo.toml").await;
    assert_eq!(removed, 1);
    assert!(!cache.contains_key(&default_scoped).await);
    assert!(cache.contains_key(&scoped("q", "/unrelated/corpus")).await);

    // The absolute working directory names the same scope as "."
    cache.put(default_scoped.clone(), fixed_entry()).await;
    assert_eq!(cache.invalidate_scope(&cwd.to_string_lossy()).await, 1);
    assert!(!cache.contains_key(&default_scoped).await);
}

#[tokio::test]
async fn test_invalidate_empty_scope_is_a_no_op() {
    let cache = SearchResultCache::new(CacheConfig::default());
    cache.put(key("q1"), fixed_entry()).await;
    cache.put(scoped("q2", "relative/dir"), fixed_entry()).await;

    assert_eq!(cache.invalidate_scope("").await, 0);
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn test_clear_preserves_cumulative_counters() {
    let cache = SearchResultCache::new(CacheConfig::default());
    cache.put(key("q1"), fixed_entry()).await;
    cache.get(&key("q1")).await;
    cache.get(&key("q2")).await;

    cache.clear().await;

    let stats = cache.stats().await;
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.total_size_bytes, 0);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hit_rate(), 0.5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_get_or_put() {
    let entry_size = fixed_entry().size_bytes();
    let config = CacheConfig::builder()
        .max_memory_bytes(entry_size * 8)
        .build();
    let cache = Arc::new(SearchResultCache::new(config));

    let tasks = (0..10).map(|worker| {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            for i in 0..100 {
                let k = key(&format!("shared {}", (worker + i) % 12));
                if cache.get(&k).await.is_none() {
                    cache.put(k, fixed_entry()).await;
                }
            }
        })
    });

    for result in join_all(tasks).await {
        result.unwrap();
    }

    let stats = cache.stats().await;
    assert_eq!(stats.hits + stats.misses, 1000);
    assert!(stats.entries >= 1 && stats.entries <= 8);
    assert_eq!(stats.total_size_bytes, stats.entries * entry_size);
    assert_eq!(cache.keys_by_recency().await.len(), stats.entries);
}
