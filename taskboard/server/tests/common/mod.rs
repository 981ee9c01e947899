use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use taskboard_server::storage::Storage;
use tower::ServiceExt;

/// Test context holding a store backed by a temporary file.
pub struct TestContext {
    #[allow(dead_code)] // dir is kept to ensure it's not dropped
    pub dir: tempfile::TempDir,
    pub storage: Arc<Storage>,
    pub app: Router,
}

impl TestContext {
    #[allow(dead_code)]
    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("db.json")
    }
}

/// Setup function for endpoint tests using a fresh store file.
pub async fn setup() -> TestContext {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let storage = Arc::new(Storage::load(dir.path().join("db.json")).await);
    let app = taskboard_server::web::create_app(storage.clone());
    TestContext { dir, storage, app }
}

/// A fully buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is not JSON")
    }
}

/// Sends a request through the router and buffers the response.
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|body| Body::from(body.to_string())).unwrap_or_default())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

/// HTTP response snapshot for testing endpoints.
#[derive(Debug, Serialize)]
pub struct HttpResponseSnapshot {
    test_context: String,
    status: u16,
    headers: BTreeMap<String, String>,
    json_body: BTreeMap<String, Value>,
}

impl HttpResponseSnapshot {
    /// Create a new HTTP response snapshot.
    #[allow(dead_code)]
    pub fn new(response: &TestResponse, test_context: &str) -> Self {
        Self {
            test_context: test_context.to_string(),
            status: response.status.as_u16(),
            headers: filter_variable_headers(&response.headers),
            json_body: response
                .json()
                .as_object()
                .map(|body| body.clone().into_iter().collect())
                .unwrap_or_default(),
        }
    }
}

/// Filter out variable headers from response headers for snapshot testing.
fn filter_variable_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let variable_headers = ["date", "server", "x-request-id", "content-length"];

    headers
        .iter()
        .filter_map(|(name, value)| {
            let name_str = name.as_str().to_lowercase();
            if variable_headers.contains(&name_str.as_str()) {
                None
            } else {
                value.to_str().ok().map(|v| (name_str, v.to_string()))
            }
        })
        .collect()
}
