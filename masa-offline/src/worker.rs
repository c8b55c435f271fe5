use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use url::Url;

use crate::config::OfflineConfig;
use crate::error::FetchError;
use crate::storage::CacheStorage;

/// A request intercepted by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    /// Top-level page navigation (as opposed to a subresource load).
    pub navigate: bool,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            navigate: false,
        }
    }

    pub fn navigation(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            navigate: true,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// The network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// Cache key: the URL without its fragment.
fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

pub struct OfflineWorker {
    config: OfflineConfig,
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<dyn CacheStorage>,
}

impl OfflineWorker {
    pub fn new(config: OfflineConfig, fetcher: Arc<dyn Fetcher>, storage: Arc<dyn CacheStorage>) -> Self {
        Self {
            config,
            fetcher,
            storage,
        }
    }

    pub fn cache_name(&self) -> String {
        self.config.cache_name()
    }

    fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        self.config
            .origin
            .join(path)
            .map_err(|_| FetchError::InvalidUrl(path.to_string()))
    }

    /// Fetch and store every precache URL. Fails if any of them fails.
    pub async fn install(&self) -> Result<(), FetchError> {
        let cache = self.cache_name();
        for path in &self.config.precache {
            let url = self.resolve(path)?;
            let response = self.fetcher.fetch(&FetchRequest::get(url.clone())).await?;
            if !response.is_success() {
                return Err(FetchError::Precache {
                    url: url.to_string(),
                    status: response.status.as_u16(),
                });
            }
            self.storage.put(&cache, &cache_key(&url), response).await;
        }
        tracing::info!(cache = %cache, entries = self.config.precache.len(), "Offline cache installed");
        Ok(())
    }

    /// Delete every cache but the current one. Returns the deleted names.
    pub async fn activate(&self) -> Vec<String> {
        let current = self.cache_name();
        let mut deleted = Vec::new();
        for name in self.storage.cache_names().await {
            if name != current && self.storage.delete(&name).await {
                tracing::debug!(cache = %name, "Stale offline cache deleted");
                deleted.push(name);
            }
        }
        deleted
    }

    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        if request.method != Method::GET || request.url.origin() != self.config.origin.origin() {
            return self.fetcher.fetch(request).await;
        }
        if request.navigate {
            self.network_first(request).await
        } else {
            self.cache_first(request).await
        }
    }

    async fn network_first(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let cache = self.cache_name();
        let key = cache_key(&request.url);
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.storage.put(&cache, &key, response.clone()).await;
                }
                Ok(response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "Navigation offline, serving from cache");
                if let Some(hit) = self.storage.get(&cache, &key).await {
                    return Ok(hit);
                }
                let root = cache_key(&self.resolve("/")?);
                self.storage
                    .get(&cache, &root)
                    .await
                    .ok_or_else(|| FetchError::Offline {
                        url: request.url.to_string(),
                    })
            }
        }
    }

    async fn cache_first(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let cache = self.cache_name();
        let key = cache_key(&request.url);
        if let Some(hit) = self.storage.get(&cache, &key).await {
            return Ok(hit);
        }
        let response = self.fetcher.fetch(request).await?;
        if response.is_success() {
            self.storage.put(&cache, &key, response.clone()).await;
        }
        Ok(response)
    }
}
