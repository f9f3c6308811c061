//! Common test utilities for router-level testing with mocks.
//!
//! The fixture builds the real router over a filesystem blob store in a
//! temp dir plus mock control plane and coordinator, so the event endpoints
//! can be driven end to end without external services.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use promoter_core::{
    config::BlobStoreConfig,
    testing::{approval_event, job_event, test_config, MockControlPlane, MockPipelineCoordinator},
    Config, Deployer, FsBlobStore, PromotionTrigger,
};
use promoter_server::state::AppState;

/// Test fixture with mock remote services.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Blob store the trigger writes to and the deployer reads from
    pub store: Arc<FsBlobStore>,
    /// Mock control plane - seed endpoints, inject failures
    pub control_plane: Arc<MockControlPlane>,
    /// Mock coordinator - inspect job reports
    pub coordinator: Arc<MockPipelineCoordinator>,
    /// Temporary directory backing the blob store
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response whose body is not JSON
#[derive(Debug)]
pub struct TextResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TestFixture {
    /// Create a new test fixture with the default test configuration.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a test fixture with a custom configuration. The blob store
    /// root is always replaced by the fixture's temp dir.
    pub fn with_config(mut config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        config.blob_store = BlobStoreConfig {
            root: temp_dir.path().join("blobs"),
        };

        let store = Arc::new(FsBlobStore::new(&config.blob_store));
        let control_plane = Arc::new(MockControlPlane::new());
        let coordinator = Arc::new(MockPipelineCoordinator::new());

        let deployer = Arc::new(Deployer::new(
            &config.deployment,
            store.clone(),
            control_plane.clone(),
            coordinator.clone(),
        ));
        let trigger = Arc::new(PromotionTrigger::new(store.clone(), config.trigger.clone()));

        let state = Arc::new(AppState::new(config, deployer, trigger));
        let router = promoter_server::api::create_router(state);

        Self {
            router,
            store,
            control_plane,
            coordinator,
            temp_dir,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, Body::empty(), None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        let bytes = serde_json::to_vec(&body).expect("Failed to encode body");
        self.request("POST", path, Body::from(bytes), Some("application/json"))
            .await
    }

    /// POST a body verbatim, e.g. malformed JSON.
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request(
            "POST",
            path,
            Body::from(body.to_string()),
            Some("application/json"),
        )
        .await
    }

    pub async fn get_text(&self, path: &str) -> TextResponse {
        let (status, bytes) = self.send("GET", path, Body::empty(), None).await;
        TextResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// Publishes `model_reference` through the approval endpoint and returns
    /// a pipeline job event pointing at the published pointer.
    pub async fn approve(&self, model_reference: &str, job_id: &str) -> Value {
        let response = self
            .post(
                "/api/v1/events/model-approval",
                approval_event("news-headlines", model_reference, "Approved"),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

        let location = &response.body["location"];
        job_event(
            job_id,
            location["bucket"].as_str().expect("bucket"),
            location["key"].as_str().expect("key"),
        )
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Body,
        content_type: Option<&str>,
    ) -> TestResponse {
        let (status, body_bytes) = self.send(method, path, body, content_type).await;

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        body: Body,
        content_type: Option<&str>,
    ) -> (StatusCode, Vec<u8>) {
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

        (status, body_bytes.to_vec())
    }
}
