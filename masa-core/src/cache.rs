use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// A thread-safe TTL cache for read-model queries, keyed by string.
///
/// Keys are namespaced as `"{scope}:{organization_id}:..."` so every view of
/// a tenant can be dropped with one [`invalidate_prefix`](Self::invalidate_prefix).
/// Entries expire after `ttl` and are evicted lazily on access.
#[derive(Clone)]
pub struct QueryCache<V> {
    inner: Arc<DashMap<String, (V, Instant)>>,
    ttl: Duration,
}

impl<V: Clone> QueryCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Get a cached value if it exists and hasn't expired.
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.inner.get(key) {
            let (value, inserted) = entry.value();
            if inserted.elapsed() < self.ttl {
                return Some(value.clone());
            }
            // Drop the read guard before removing.
            drop(entry);
            self.inner.remove(key);
        }
        None
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.inner.insert(key.into(), (value, Instant::now()));
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// Errors are returned as-is and never cached.
    pub async fn get_or_try_insert<E, F, Fut>(&self, key: &str, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let value = load().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn remove(&self, key: &str) {
        self.inner.remove(key);
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.inner.retain(|k, _| !k.starts_with(prefix));
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_entries_are_evicted() {
        let cache = QueryCache::new(Duration::from_millis(20));
        cache.insert("menu:a", 1);
        assert_eq!(cache.get("menu:a"), Some(1));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("menu:a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn prefix_invalidation_is_scoped() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.insert("dashboard:org1:requests", 1);
        cache.insert("dashboard:org1:summary", 2);
        cache.insert("dashboard:org2:requests", 3);
        cache.invalidate_prefix("dashboard:org1:");
        assert_eq!(cache.get("dashboard:org1:requests"), None);
        assert_eq!(cache.get("dashboard:org2:requests"), Some(3));
    }

    #[tokio::test]
    async fn loader_errors_are_not_cached() {
        let cache: QueryCache<u32> = QueryCache::new(Duration::from_secs(60));
        let failed: Result<u32, &str> = cache.get_or_try_insert("k", || async { Err("boom") }).await;
        assert!(failed.is_err());
        let ok: Result<u32, &str> = cache.get_or_try_insert("k", || async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));
        let hit: Result<u32, &str> = cache.get_or_try_insert("k", || async { Ok(8) }).await;
        assert_eq!(hit, Ok(7));
    }
}
