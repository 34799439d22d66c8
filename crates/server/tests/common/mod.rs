//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the full router in-process
//! with a mock group processor, so jobs run end to end without a real
//! pipeline command.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use phenorun_core::{
    testing::MockGroupProcessor, Config, JobRunner, JobsConfig, MemoryAbortSignal,
    PipelineConfig, ServerConfig, SqliteLaunchStore, StorageConfig,
};

/// Re-export fixtures for test convenience
#[allow(unused_imports)]
pub use phenorun_core::testing::fixtures;

/// Test fixture for API testing with a mock pipeline.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/jobs/alice", json!({ "items": ["a"] })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock processor - inspect calls
    pub processor: Arc<MockGroupProcessor>,
    /// Temporary directory for the database and job outputs
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an instant mock processor.
    pub fn new() -> Self {
        Self::with_processor(MockGroupProcessor::new())
    }

    /// Create a test fixture around a configured mock processor.
    pub fn with_processor(processor: MockGroupProcessor) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("data");
        let processor = Arc::new(processor);

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            storage: StorageConfig {
                data_dir: data_dir.clone(),
                database_path: temp_dir.path().join("test.db"),
                ..Default::default()
            },
            jobs: JobsConfig::default(),
            pipeline: PipelineConfig {
                command: "ipso-cli".to_string(),
                args: vec!["--token".to_string(), "secret".to_string()],
                timeout_secs: 60,
            },
        };

        let store = Arc::new(
            SqliteLaunchStore::new(&config.storage.database_path)
                .expect("Failed to create launch store"),
        );
        let runner = Arc::new(JobRunner::new(
            store,
            Arc::new(MemoryAbortSignal::new()),
            Arc::clone(&processor) as Arc<dyn phenorun_core::GroupProcessor>,
            data_dir,
            config.jobs.clone(),
        ));

        let state = Arc::new(phenorun_server::state::AppState::new(config, runner));
        let router = phenorun_server::api::create_router(state);

        Self {
            router,
            processor,
            temp_dir,
        }
    }

    /// Serve the router on an ephemeral local port, for clients that need a
    /// real connection (WebSocket upgrades).
    pub async fn serve(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener has an address");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        addr
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request_raw("POST", path, Body::from(body.to_string()), Some("application/json"))
            .await
    }

    /// Poll a job until it reaches a terminal status.
    pub async fn wait_for_terminal(&self, key: &str) -> Value {
        let path = format!("/api/v1/jobs/{}", key);
        for _ in 0..200 {
            let response = self.get(&path).await;
            let status = response.body["status"].as_str().unwrap_or_default().to_string();
            if matches!(status.as_str(), "completed" | "aborted" | "failed") {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {} did not finish in time", key);
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        match body {
            Some(json_body) => {
                let bytes = serde_json::to_vec(&json_body).unwrap();
                self.request_raw(method, path, Body::from(bytes), Some("application/json"))
                    .await
            }
            None => self.request_raw(method, path, Body::empty(), None).await,
        }
    }

    async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body: Body,
        content_type: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            request_builder = request_builder.header("Content-Type", content_type);
        }
        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).to_string()))
        };

        TestResponse { status, body }
    }
}
