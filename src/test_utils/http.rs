//! HTTP testing utilities
use super::fixtures::{DEFAULT_DATABASE, test_index};
use super::influxdb::RecordingInfluxDbClient;
use crate::http::server::build_app_routes;
use crate::http::state::HttpServerState;
use crate::mapping::{ClassificationIndex, IndexHandle, MappingSource};
use anyhow::Result;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderMap, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot` and `ready`

/// HTTP test client for making requests to our app
pub struct TestApp {
    app: axum::Router,
    state: HttpServerState,
    client: Arc<RecordingInfluxDbClient>,
}

impl TestApp {
    /// Test app on the fixture mapping, backed by a recording InfluxDB client.
    pub fn new() -> Self {
        Self::with_index(test_index())
    }

    pub fn with_index(index: ClassificationIndex) -> Self {
        Self::build(index, None, "")
    }

    pub fn with_retention_policy(retention_policy: &str) -> Self {
        Self::build(test_index(), None, retention_policy)
    }

    /// Test app whose mapping can be reloaded from `source`.
    pub fn with_mapping_source(source: MappingSource) -> Result<Self> {
        let index = source.build_index()?;
        Ok(Self::build(index, Some(source), ""))
    }

    fn build(
        index: ClassificationIndex,
        source: Option<MappingSource>,
        retention_policy: &str,
    ) -> Self {
        let client = Arc::new(RecordingInfluxDbClient::new());
        let mut state = HttpServerState::new(
            "Remote Storage Adapter Test",
            Arc::new(IndexHandle::new(index)),
            client.clone(),
            retention_policy,
            2,
        );
        if let Some(source) = source {
            state = state.with_mapping_source(source);
        }

        // Use the shared route builder from the main server
        // This ensures tests use the exact same routes as production
        let max_body_layer = DefaultBodyLimit::max(10 * 1024 * 1024); // 10MB for tests
        let app = build_app_routes(state.clone(), max_body_layer);

        Self { app, state, client }
    }

    /// The recording InfluxDB client behind the app.
    pub fn influxdb(&self) -> &RecordingInfluxDbClient {
        &self.client
    }

    pub fn state(&self) -> &HttpServerState {
        &self.state
    }

    pub fn default_database(&self) -> &str {
        DEFAULT_DATABASE
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())?;

        let response = self.app.clone().oneshot(request).await?;
        Ok(TestResponse::new(response).await)
    }

    /// Send an empty POST request
    pub async fn post(&self, path: &str) -> Result<TestResponse> {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .body(Body::empty())?;

        let response = self.app.clone().oneshot(request).await?;
        Ok(TestResponse::new(response).await)
    }

    /// Send a POST request with binary data and an explicit content type
    pub async fn post_binary(
        &self,
        path: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<TestResponse> {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", content_type)
            .body(Body::from(data.to_vec()))?;

        let response = self.app.clone().oneshot(request).await?;
        Ok(TestResponse::new(response).await)
    }

    /// Send a Prometheus remote read request (compressed protobuf)
    pub async fn post_prometheus_read(
        &self,
        path: &str,
        compressed_data: &[u8],
    ) -> Result<TestResponse> {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/x-protobuf")
            .header("content-encoding", "snappy")
            .header("x-prometheus-remote-read-version", "0.1.0")
            .body(Body::from(compressed_data.to_vec()))?;

        let response = self.app.clone().oneshot(request).await?;
        Ok(TestResponse::new(response).await)
    }

    /// Send a Prometheus remote write request (compressed protobuf)
    pub async fn post_prometheus_write(
        &self,
        path: &str,
        compressed_data: &[u8],
    ) -> Result<TestResponse> {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/x-protobuf")
            .header("content-encoding", "snappy")
            .header("x-prometheus-remote-write-version", "0.1.0")
            .body(Body::from(compressed_data.to_vec()))?;

        let response = self.app.clone().oneshot(request).await?;
        Ok(TestResponse::new(response).await)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Test response wrapper for easier assertions
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body_bytes: Vec<u8>,
    body: String,
}

impl TestResponse {
    async fn new(response: axum::response::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default()
            .to_vec();
        let body = String::from_utf8_lossy(&body_bytes).to_string();

        Self {
            status,
            headers,
            body_bytes,
            body,
        }
    }

    /// Get response status
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get response body as string
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Get response body as bytes
    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    /// Check if response was successful (2xx)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parse response body as JSON
    pub fn json<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(&self.body).map_err(Into::into)
    }

    /// Assert status code
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {}. Body: {}",
            expected, self.status, self.body
        );
        self
    }

    /// Assert response body contains text
    pub fn assert_body_contains(&self, text: &str) -> &Self {
        assert!(
            self.body.contains(text),
            "Expected body to contain '{}', but body was: {}",
            text,
            self.body
        );
        self
    }

    /// Get response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Assert specific header value
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let actual = self
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<missing>");
        assert_eq!(
            actual, expected,
            "Expected header '{}' to be '{}', but was '{}'",
            name, expected, actual
        );
        self
    }

    /// Assert content-type header
    pub fn assert_content_type(&self, expected: &str) -> &Self {
        self.assert_header("content-type", expected)
    }
}
