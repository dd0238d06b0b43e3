//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with mock dependencies injected, so the HTTP surface can be exercised
//! without ffmpeg or a real Authorizer.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use transflow_core::{
    testing::{MockAuthenticator, MockExecutor, RecordingNotifier},
    AdmissionGateway, AuthConfig, AuthMethod, Authenticator, Config, DatabaseConfig,
    ExecutionBudget, JobOrchestrator, JobStore, SinkConfig, SqliteJobStore,
};

/// Re-export fixtures for test convenience
pub use transflow_core::testing::fixtures;

/// Token accepted by the fixture's authenticator.
pub const TOKEN: &str = "test-token";

/// Test fixture with an in-process router and mock seams.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.submit(fixtures::job_payload("clip-1")).await;
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock executor - script reports and delays
    pub executor: MockExecutor,
    /// Mock authenticator - toggle outages
    pub auth: MockAuthenticator,
    /// Records completion notifications
    pub notifier: RecordingNotifier,
    /// Job store behind the router
    pub store: Arc<dyn JobStore>,
    /// Temporary directory for the database and media root
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let media_root = temp_dir.path().join("media");
        std::fs::create_dir_all(&media_root).expect("Failed to create media root");

        let executor = MockExecutor::new();
        let auth = MockAuthenticator::new(TOKEN);
        let notifier = RecordingNotifier::new();

        let config = Config {
            auth: AuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some(TOKEN.to_string()),
                ..Default::default()
            },
            server: Default::default(),
            database: DatabaseConfig { path: db_path.clone() },
            executor: Default::default(),
            sink: SinkConfig {
                root: media_root,
                ..Default::default()
            },
            notifier: Default::default(),
            second_stage: Default::default(),
        };

        let store: Arc<dyn JobStore> =
            Arc::new(SqliteJobStore::new(&db_path).expect("Failed to create job store"));
        let orchestrator = Arc::new(JobOrchestrator::new(
            Arc::clone(&store),
            Arc::new(executor.clone()),
            Arc::new(notifier.clone()),
            ExecutionBudget {
                memory_mb: 512,
                timeout: Duration::from_secs(5),
            },
        ));
        let authenticator: Arc<dyn Authenticator> = Arc::new(auth.clone());
        let gateway = Arc::new(AdmissionGateway::new(
            Arc::clone(&authenticator),
            orchestrator,
            Duration::from_millis(500),
        ));

        let state = Arc::new(transflow_server::state::AppState::new(
            config,
            authenticator,
            gateway,
        ));
        let router = transflow_server::api::create_router(state);

        Self {
            router,
            executor,
            auth,
            notifier,
            store,
            temp_dir,
        }
    }

    /// Path of the media root served under `/media`.
    pub fn media_root(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("media")
    }

    /// Send an authenticated GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, Some(TOKEN), Body::empty()).await
    }

    /// Send a GET request with an explicit (or no) token.
    pub async fn get_with_token(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request("GET", path, token, Body::empty()).await
    }

    /// Submit a job payload with the valid token.
    pub async fn submit(&self, payload: Value) -> TestResponse {
        self.submit_with_token(payload, Some(TOKEN)).await
    }

    /// Submit a job payload with an explicit (or no) token.
    pub async fn submit_with_token(&self, payload: Value, token: Option<&str>) -> TestResponse {
        self.request(
            "POST",
            "/api/v1/jobs",
            token,
            Body::from(serde_json::to_vec(&payload).unwrap()),
        )
        .await
    }

    /// Submit a raw body (for testing malformed JSON).
    pub async fn submit_raw(&self, body: &str) -> TestResponse {
        self.request("POST", "/api/v1/jobs", Some(TOKEN), Body::from(body.to_string()))
            .await
    }

    /// Submit raw bytes with an explicit (or no) token.
    pub async fn submit_bytes(&self, body: Vec<u8>, token: Option<&str>) -> TestResponse {
        self.request("POST", "/api/v1/jobs", token, Body::from(body)).await
    }

    /// Poll the job's status endpoint until it is terminal.
    pub async fn wait_for_terminal(&self, job_id: &str) -> TestResponse {
        let path = format!("/api/v1/jobs/{}", job_id);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let response = self.get(&path).await;
            let state = response.body["state"].as_str().unwrap_or_default();
            if state == "succeeded" || state == "failed" {
                return response;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("job {} did not finish, last state: {}", job_id, state);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Send a request and return the raw response body.
    pub async fn raw(&self, path: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, bytes.to_vec())
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Body,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = builder.body(body).unwrap();

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
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
