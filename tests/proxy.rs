//! End-to-end tests: the proxy router in front of a mock TMDB server

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    routing::get,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use showcache::cache::LoadPolicy;
use showcache::server::{build_router, AppState, ErrorResponse, HealthResponse};
use showcache::upstream::UpstreamClient;

const DETAIL_BODY: &str = r#"{"id":1396,"name":"Breaking Bad","number_of_seasons":5,"status":"Ended"}"#;
const TRAILING_NEWLINE_BODY: &str = "{\"id\":7}\n";
const NOT_FOUND_BODY: &str =
    r#"{"success":false,"status_code":34,"status_message":"The resource you requested could not be found."}"#;

/// Records every request the proxy sends upstream
#[derive(Clone, Default)]
struct MockUpstream {
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
    authorization: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    fn record(&self, uri: &Uri, headers: &HeaderMap) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(uri.to_string());
        if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            self.authorization.lock().unwrap().push(value.to_string());
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn search_tv(
    State(upstream): State<MockUpstream>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    upstream.record(&uri, &headers);
    let query = params.get("query").cloned().unwrap_or_default();
    let body = format!(
        r#"{{"page":1,"results":[{{"name":{}}}],"total_pages":1,"total_results":1}}"#,
        serde_json::to_string(&query).unwrap()
    );
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], body)
}

async fn tv_details(
    State(upstream): State<MockUpstream>,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    upstream.record(&uri, &headers);
    let json = [(header::CONTENT_TYPE, "application/json")];
    match id.as_str() {
        "1396" => (StatusCode::OK, json, DETAIL_BODY.to_string()),
        "7" => (StatusCode::OK, json, TRAILING_NEWLINE_BODY.to_string()),
        "42" => (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], "<html>maintenance</html>".to_string()),
        _ => (StatusCode::NOT_FOUND, json, NOT_FOUND_BODY.to_string()),
    }
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server error");
    });
    addr
}

async fn spawn_upstream(upstream: MockUpstream) -> SocketAddr {
    let app = Router::new()
        .route("/3/search/tv", get(search_tv))
        .route("/3/tv/{id}", get(tv_details))
        .with_state(upstream);
    spawn(app).await
}

async fn spawn_proxy(upstream_addr: SocketAddr, cache_dir: &std::path::Path) -> SocketAddr {
    let client = UpstreamClient::new(&format!("http://{}/3", upstream_addr), "test-token")
        .expect("valid base URL");
    let state = AppState::open_with(cache_dir, LoadPolicy::Strict, client)
        .await
        .expect("State should open");
    spawn(build_router(state)).await
}

struct Harness {
    proxy: SocketAddr,
    upstream: MockUpstream,
    upstream_addr: SocketAddr,
    cache_dir: TempDir,
    http: reqwest::Client,
}

impl Harness {
    async fn start() -> Self {
        let cache_dir = TempDir::new().expect("Failed to create temp directory");
        let upstream = MockUpstream::default();
        let upstream_addr = spawn_upstream(upstream.clone()).await;
        let proxy = spawn_proxy(upstream_addr, cache_dir.path()).await;
        Self {
            proxy,
            upstream,
            upstream_addr,
            cache_dir,
            http: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.http
            .post(format!("http://{}{}", self.proxy, path))
            .json(&body)
            .send()
            .await
            .expect("Request should complete")
    }

    async fn health(&self) -> HealthResponse {
        self.http
            .get(format!("http://{}/health", self.proxy))
            .send()
            .await
            .expect("Request should complete")
            .json()
            .await
            .expect("Health should be JSON")
    }

    fn cache_file(&self, name: &str) -> serde_json::Value {
        let content = std::fs::read_to_string(self.cache_dir.path().join(name)).expect("Cache file should exist");
        serde_json::from_str(&content).expect("Cache file should be JSON")
    }
}

#[tokio::test]
async fn test_search_space_variants_hit_cache() {
    let harness = Harness::start().await;

    let first = harness.post("/tv/search", serde_json::json!({ "query": "Breaking Bad" })).await;
    assert_eq!(first.status(), 200);
    let first_body = first.text().await.unwrap();

    let second = harness.post("/tv/search", serde_json::json!({ "query": "BreakingBad" })).await;
    assert_eq!(second.status(), 200);
    let second_body = second.text().await.unwrap();

    assert_eq!(harness.upstream.calls(), 1, "Second search should be served from cache");
    assert_eq!(first_body, second_body);
    assert!(first_body.contains("Breaking Bad"));

    let file = harness.cache_file("search_cache.json");
    assert_eq!(file.as_object().unwrap().len(), 1);
    assert_eq!(file["BreakingBad"]["results"][0]["name"], "Breaking Bad");
}

#[tokio::test]
async fn test_search_sends_fixed_parameters_and_credential() {
    let harness = Harness::start().await;

    let response = harness.post("/tv/search", serde_json::json!({ "query": "The Wire" })).await;
    assert_eq!(response.status(), 200);

    assert_eq!(
        harness.upstream.requests(),
        vec!["/3/search/tv?include_adult=false&language=en-US&page=1&query=The+Wire".to_string()]
    );
    assert_eq!(
        harness.upstream.authorization.lock().unwrap().clone(),
        vec!["Bearer test-token".to_string()]
    );
}

#[tokio::test]
async fn test_search_is_case_sensitive() {
    let harness = Harness::start().await;

    harness.post("/tv/search", serde_json::json!({ "query": "Breaking Bad" })).await;
    harness.post("/tv/search", serde_json::json!({ "query": "breaking bad" })).await;

    assert_eq!(harness.upstream.calls(), 2);
    assert_eq!(harness.health().await.search_entries, 2);
}

#[tokio::test]
async fn test_all_space_query_uses_empty_key() {
    let harness = Harness::start().await;

    let response = harness.post("/tv/search", serde_json::json!({ "query": "   " })).await;
    assert_eq!(response.status(), 200);
    let again = harness.post("/tv/search", serde_json::json!({ "query": " " })).await;
    assert_eq!(again.status(), 200);

    assert_eq!(harness.upstream.calls(), 1);
    let file = harness.cache_file("search_cache.json");
    assert!(file.get("").is_some(), "Empty key should be stored");
}

#[tokio::test]
async fn test_details_miss_fetches_and_stores_verbatim() {
    let harness = Harness::start().await;

    let response = harness.post("/tv/details", serde_json::json!({ "id": 1396 })).await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(response.text().await.unwrap(), DETAIL_BODY);
    assert_eq!(
        harness.upstream.requests(),
        vec!["/3/tv/1396?language=en-US".to_string()]
    );

    let file = harness.cache_file("details_cache.json");
    assert_eq!(file["1396"]["name"], "Breaking Bad");

    let cached = harness.post("/tv/details", serde_json::json!({ "id": 1396 })).await;
    assert_eq!(cached.text().await.unwrap(), DETAIL_BODY);
    assert_eq!(harness.upstream.calls(), 1);
}

#[tokio::test]
async fn test_upstream_404_is_500_and_not_cached() {
    let harness = Harness::start().await;

    let response = harness.post("/tv/details", serde_json::json!({ "id": 999999 })).await;

    assert_eq!(response.status(), 500);
    let error: ErrorResponse = response.json().await.expect("Error should be JSON");
    assert!(error.error.contains("404"), "error: {}", error.error);
    assert!(error.error.contains("could not be found"), "error: {}", error.error);

    assert_eq!(harness.health().await.details_entries, 0);
    assert!(!harness.cache_dir.path().join("details_cache.json").exists());

    // Failures are not remembered: the next request goes upstream again
    harness.post("/tv/details", serde_json::json!({ "id": 999999 })).await;
    assert_eq!(harness.upstream.calls(), 2);
}

#[tokio::test]
async fn test_non_json_upstream_body_is_500_and_not_cached() {
    let harness = Harness::start().await;

    let response = harness.post("/tv/details", serde_json::json!({ "id": 42 })).await;

    assert_eq!(response.status(), 500);
    assert_eq!(harness.health().await.details_entries, 0);
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let harness = Harness::start().await;

    let cases = [
        ("/tv/search", serde_json::json!({})),
        ("/tv/search", serde_json::json!({ "query": "" })),
        ("/tv/search", serde_json::json!({ "query": 5 })),
        ("/tv/details", serde_json::json!({})),
        ("/tv/details", serde_json::json!({ "id": "1396" })),
        ("/tv/details", serde_json::json!({ "id": 0 })),
    ];

    for (path, body) in cases {
        let response = harness.post(path, body.clone()).await;
        assert_eq!(response.status(), 400, "{} {}", path, body);
        let error: ErrorResponse = response.json().await.expect("Error should be JSON");
        assert!(!error.error.is_empty());
    }

    assert_eq!(harness.upstream.calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let harness = Harness::start().await;

    let response = harness
        .http
        .post(format!("http://{}/tv/search", harness.proxy))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{\"query\": ")
        .send()
        .await
        .expect("Request should complete");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let harness = Harness::start().await;
    harness.post("/tv/details", serde_json::json!({ "id": 1396 })).await;
    harness.post("/tv/search", serde_json::json!({ "query": "Breaking Bad" })).await;
    assert_eq!(harness.upstream.calls(), 2);

    let restarted = spawn_proxy(harness.upstream_addr, harness.cache_dir.path()).await;
    let response = harness
        .http
        .post(format!("http://{}/tv/details", restarted))
        .json(&serde_json::json!({ "id": 1396 }))
        .send()
        .await
        .expect("Request should complete");

    assert_eq!(response.text().await.unwrap(), DETAIL_BODY);
    assert_eq!(harness.upstream.calls(), 2, "Restarted proxy should answer from disk");
}

#[tokio::test]
async fn test_concurrent_distinct_misses_all_persist() {
    let harness = Arc::new(Harness::start().await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let harness = Arc::clone(&harness);
        handles.push(tokio::spawn(async move {
            harness
                .post("/tv/search", serde_json::json!({ "query": format!("show {}", i) }))
                .await
                .status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    let file = harness.cache_file("search_cache.json");
    assert_eq!(file.as_object().unwrap().len(), 8);
}

#[tokio::test]
async fn test_failed_save_still_answers_and_keeps_entry() {
    let harness = Harness::start().await;
    // A directory in place of the cache file makes every save fail
    std::fs::create_dir(harness.cache_dir.path().join("details_cache.json")).expect("Should create dir");

    let first = harness.post("/tv/details", serde_json::json!({ "id": 1396 })).await;
    assert_eq!(first.status(), 200);
    assert_eq!(first.text().await.unwrap(), DETAIL_BODY);

    let second = harness.post("/tv/details", serde_json::json!({ "id": 1396 })).await;
    assert_eq!(second.status(), 200);
    assert_eq!(second.text().await.unwrap(), DETAIL_BODY);

    assert_eq!(harness.upstream.calls(), 1, "Entry should be served from memory");
    assert_eq!(harness.health().await.details_entries, 1);
}

#[tokio::test]
async fn test_repeated_search_saves_once() {
    let harness = Harness::start().await;
    let path = harness.cache_dir.path().join("search_cache.json");

    let first = harness.post("/tv/search", serde_json::json!({ "query": "Breaking Bad" })).await;
    assert_eq!(first.status(), 200);
    assert!(path.exists(), "Miss should write the cache file");
    std::fs::remove_file(&path).expect("Should remove cache file");

    let second = harness.post("/tv/search", serde_json::json!({ "query": "Breaking Bad" })).await;
    assert_eq!(second.status(), 200);

    assert_eq!(harness.upstream.calls(), 1);
    assert!(!path.exists(), "Hit should not rewrite the cache file");
}

#[tokio::test]
async fn test_body_returned_verbatim_on_miss_and_hit() {
    let harness = Harness::start().await;

    let miss = harness.post("/tv/details", serde_json::json!({ "id": 7 })).await;
    assert_eq!(miss.text().await.unwrap(), TRAILING_NEWLINE_BODY);

    let hit = harness.post("/tv/details", serde_json::json!({ "id": 7 })).await;
    assert_eq!(hit.text().await.unwrap(), TRAILING_NEWLINE_BODY);
    assert_eq!(harness.upstream.calls(), 1);
}
