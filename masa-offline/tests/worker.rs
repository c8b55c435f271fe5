use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::{Method, StatusCode};
use masa_offline::*;
use url::Url;

const ORIGIN: &str = "https://menu.example.com";

/// Scripted network: fixed responses per URL, can be switched offline.
#[derive(Default)]
struct FakeNetwork {
    responses: Mutex<HashMap<String, FetchResponse>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl FakeNetwork {
    fn serve(&self, path: &str, response: FetchResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{ORIGIN}{path}"), response);
    }

    fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for FakeNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Network {
                url: request.url.to_string(),
                message: "offline".into(),
            });
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(StatusCode::NOT_FOUND, "")))
    }
}

fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

fn setup(version: u32) -> (Arc<FakeNetwork>, InMemoryCacheStorage, OfflineWorker) {
    let network = Arc::new(FakeNetwork::default());
    network.serve("/", FetchResponse::ok("<html>home</html>"));
    network.serve("/manifest.json", FetchResponse::ok("{}"));
    let storage = InMemoryCacheStorage::new();
    let mut config = OfflineConfig::new(Url::parse(ORIGIN).unwrap());
    config.version = version;
    let worker = OfflineWorker::new(config, network.clone(), Arc::new(storage.clone()));
    (network, storage, worker)
}

#[tokio::test]
async fn install_precaches_into_versioned_cache() {
    let (_, storage, worker) = setup(3);
    assert_eq!(worker.cache_name(), "masa-v3");
    worker.install().await.unwrap();
    assert_eq!(storage.entry_count("masa-v3"), 2);
}

#[tokio::test]
async fn install_fails_when_a_precache_url_fails() {
    let (network, _, worker) = setup(1);
    network.serve("/manifest.json", FetchResponse::new(StatusCode::INTERNAL_SERVER_ERROR, ""));
    assert!(matches!(
        worker.install().await,
        Err(FetchError::Precache { status: 500, .. })
    ));
}

#[tokio::test]
async fn activate_deletes_other_caches() {
    let (_, storage, worker) = setup(2);
    storage.put("masa-v1", "https://menu.example.com/", FetchResponse::ok("old")).await;
    worker.install().await.unwrap();
    assert_eq!(worker.activate().await, vec!["masa-v1".to_string()]);
    assert_eq!(storage.cache_names().await, vec!["masa-v2".to_string()]);
}

#[tokio::test]
async fn failed_navigation_falls_back_to_cached_root() {
    let (network, _, worker) = setup(1);
    worker.install().await.unwrap();
    network.go_offline();

    let response = worker
        .handle_fetch(&FetchRequest::navigation(url("/m/kebap?t=abc")))
        .await
        .unwrap();
    assert_eq!(response.body, "<html>home</html>");
}

#[tokio::test]
async fn navigation_prefers_network_and_refreshes_cache() {
    let (network, storage, worker) = setup(1);
    network.serve("/m/kebap", FetchResponse::ok("menu v1"));
    worker.handle_fetch(&FetchRequest::navigation(url("/m/kebap"))).await.unwrap();

    network.serve("/m/kebap", FetchResponse::ok("menu v2"));
    let fresh = worker.handle_fetch(&FetchRequest::navigation(url("/m/kebap"))).await.unwrap();
    assert_eq!(fresh.body, "menu v2");

    network.go_offline();
    let cached = worker.handle_fetch(&FetchRequest::navigation(url("/m/kebap#top"))).await.unwrap();
    assert_eq!(cached.body, "menu v2");
    assert_eq!(storage.entry_count("masa-v1"), 1);
}

#[tokio::test]
async fn navigation_without_any_cache_is_offline_error() {
    let (network, _, worker) = setup(1);
    network.go_offline();
    assert!(matches!(
        worker.handle_fetch(&FetchRequest::navigation(url("/"))).await,
        Err(FetchError::Offline { .. })
    ));
}

#[tokio::test]
async fn assets_are_cache_first() {
    let (network, _, worker) = setup(1);
    network.serve("/app.css", FetchResponse::ok("body{}"));

    worker.handle_fetch(&FetchRequest::get(url("/app.css"))).await.unwrap();
    let calls = network.calls.load(Ordering::SeqCst);

    network.serve("/app.css", FetchResponse::ok("changed"));
    let again = worker.handle_fetch(&FetchRequest::get(url("/app.css"))).await.unwrap();
    assert_eq!(again.body, "body{}");
    assert_eq!(network.calls.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn failed_assets_are_not_cached() {
    let (_network, storage, worker) = setup(1);
    let missing = worker.handle_fetch(&FetchRequest::get(url("/missing.png"))).await.unwrap();
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(storage.entry_count("masa-v1"), 0);
}

#[tokio::test]
async fn non_get_and_cross_origin_pass_through() {
    let (network, storage, worker) = setup(1);

    let post = FetchRequest::get(url("/api/service-requests")).with_method(Method::POST);
    worker.handle_fetch(&post).await.unwrap();

    let cdn = FetchRequest::get(Url::parse("https://cdn.example.net/logo.png").unwrap());
    worker.handle_fetch(&cdn).await.unwrap();

    assert_eq!(network.calls.load(Ordering::SeqCst), 2);
    assert_eq!(storage.entry_count("masa-v1"), 0);
}
