use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::worker::FetchResponse;

/// Named response caches, keyed by URL.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn cache_names(&self) -> Vec<String>;
    async fn delete(&self, cache: &str) -> bool;
    async fn put(&self, cache: &str, url: &str, response: FetchResponse);
    async fn get(&self, cache: &str, url: &str) -> Option<FetchResponse>;
}

#[derive(Clone, Default)]
pub struct InMemoryCacheStorage {
    caches: Arc<DashMap<String, HashMap<String, FetchResponse>>>,
}

impl InMemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self, cache: &str) -> usize {
        self.caches.get(cache).map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CacheStorage for InMemoryCacheStorage {
    async fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    async fn delete(&self, cache: &str) -> bool {
        self.caches.remove(cache).is_some()
    }

    async fn put(&self, cache: &str, url: &str, response: FetchResponse) {
        self.caches
            .entry(cache.to_string())
            .or_default()
            .insert(url.to_string(), response);
    }

    async fn get(&self, cache: &str, url: &str) -> Option<FetchResponse> {
        self.caches.get(cache).and_then(|c| c.get(url).cloned())
    }
}
