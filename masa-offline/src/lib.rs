//! Offline support for the public menu.
//!
//! [`OfflineWorker`] is the caching strategy a browser service worker runs:
//! a versioned cache filled at install time, stale caches dropped at
//! activation, network-first page navigations with a cached fallback and
//! cache-first static assets. The network and the cache store are traits so
//! the strategy can run and be tested anywhere.

mod config;
mod error;
mod storage;
mod worker;

pub use config::OfflineConfig;
pub use error::FetchError;
pub use storage::{CacheStorage, InMemoryCacheStorage};
pub use worker::{FetchRequest, FetchResponse, Fetcher, OfflineWorker};
