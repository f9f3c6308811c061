//! HTTP control plane client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ControlPlaneConfig;
use crate::metrics;

use super::types::{
    ControlPlane, ControlPlaneError, EndpointConfigHandle, EndpointConfigSpec,
    EndpointDescription, ModelHandle, ModelSpec,
};
use super::waiter::wait_until_in_service;

/// Error body returned by the control plane on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    code: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct CreateEndpointRequest<'a> {
    name: &'a str,
    config_name: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateEndpointRequest<'a> {
    config_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedResource {
    id: String,
}

/// Control plane reached over its JSON/HTTP API.
///
/// Routes:
/// - `POST /models`
/// - `POST /endpoint-configs`
/// - `GET /endpoints/{name}`
/// - `POST /endpoints`
/// - `PUT /endpoints/{name}`
pub struct HttpControlPlane {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl HttpControlPlane {
    /// Create a new client. `poll_interval` paces the convergence wait.
    pub fn new(
        config: &ControlPlaneConfig,
        poll_interval: Duration,
    ) -> Result<Self, ControlPlaneError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| ControlPlaneError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            poll_interval,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn endpoint_path(name: &str) -> String {
        format!("/endpoints/{}", urlencoding::encode(name))
    }

    /// Sends a request, recording latency and outcome under `operation`.
    async fn send(
        &self,
        operation: &str,
        builder: RequestBuilder,
    ) -> Result<Response, ControlPlaneError> {
        let start = Instant::now();
        let result = match builder.send().await {
            Ok(response) if response.status().is_success() => Ok(response),
            Ok(response) => Err(error_from_response(response).await),
            Err(e) => Err(map_send_error(e)),
        };

        let outcome = match &result {
            Ok(_) => "success",
            Err(ControlPlaneError::Service { .. }) => "rejected",
            Err(_) => "error",
        };
        metrics::CONTROL_PLANE_REQUESTS
            .with_label_values(&[operation, outcome])
            .inc();
        metrics::CONTROL_PLANE_DURATION
            .with_label_values(&[operation])
            .observe(start.elapsed().as_secs_f64());
        debug!(operation, outcome, "Control plane request finished");

        result
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        builder: RequestBuilder,
    ) -> Result<T, ControlPlaneError> {
        self.send(operation, builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ControlPlaneError::Decode(e.to_string()))
    }
}

fn map_send_error(e: reqwest::Error) -> ControlPlaneError {
    if e.is_timeout() {
        ControlPlaneError::Timeout
    } else {
        ControlPlaneError::Transport(e.to_string())
    }
}

/// Turns a non-2xx response into a service error.
///
/// Bodies that are not `{"code", "message"}` become an `HttpError` carrying
/// the status and the start of the body.
async fn error_from_response(response: Response) -> ControlPlaneError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ServiceErrorBody>(&body) {
        Ok(err) => ControlPlaneError::service(err.code, err.message),
        Err(_) => ControlPlaneError::service(
            "HttpError",
            format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            ),
        ),
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    fn name(&self) -> &str {
        "http"
    }

    async fn create_model(&self, spec: &ModelSpec) -> Result<ModelHandle, ControlPlaneError> {
        let created: CreatedResource = self
            .send_json("create_model", self.request(Method::POST, "/models").json(spec))
            .await?;
        Ok(ModelHandle {
            name: spec.name.clone(),
            id: created.id,
        })
    }

    async fn create_endpoint_config(
        &self,
        spec: &EndpointConfigSpec,
    ) -> Result<EndpointConfigHandle, ControlPlaneError> {
        let created: CreatedResource = self
            .send_json(
                "create_endpoint_config",
                self.request(Method::POST, "/endpoint-configs").json(spec),
            )
            .await?;
        Ok(EndpointConfigHandle {
            name: spec.name.clone(),
            id: created.id,
        })
    }

    async fn describe_endpoint(
        &self,
        name: &str,
    ) -> Result<EndpointDescription, ControlPlaneError> {
        self.send_json(
            "describe_endpoint",
            self.request(Method::GET, &Self::endpoint_path(name)),
        )
        .await
    }

    async fn create_endpoint(
        &self,
        name: &str,
        config_name: &str,
    ) -> Result<(), ControlPlaneError> {
        self.send(
            "create_endpoint",
            self.request(Method::POST, "/endpoints")
                .json(&CreateEndpointRequest { name, config_name }),
        )
        .await
        .map(|_| ())
    }

    async fn update_endpoint(
        &self,
        name: &str,
        config_name: &str,
    ) -> Result<(), ControlPlaneError> {
        self.send(
            "update_endpoint",
            self.request(Method::PUT, &Self::endpoint_path(name))
                .json(&UpdateEndpointRequest { config_name }),
        )
        .await
        .map(|_| ())
    }

    async fn wait_until_healthy(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<EndpointDescription, ControlPlaneError> {
        wait_until_in_service(self, name, timeout, self.poll_interval).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::{EndpointStatus, VALIDATION_EXCEPTION};
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeState {
        endpoints: HashMap<String, EndpointDescription>,
        models: Vec<ModelSpec>,
        auth_headers: Vec<Option<String>>,
    }

    type Shared = Arc<Mutex<FakeState>>;

    fn validation(message: String) -> (StatusCode, Json<serde_json::Value>) {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "code": VALIDATION_EXCEPTION, "message": message })),
        )
    }

    async fn create_model(
        State(state): State<Shared>,
        headers: HeaderMap,
        Json(spec): Json<ModelSpec>,
    ) -> Json<serde_json::Value> {
        let mut state = state.lock().unwrap();
        state.auth_headers.push(
            headers
                .get("authorization")
                .map(|v| v.to_str().unwrap().to_string()),
        );
        state.models.push(spec);
        Json(serde_json::json!({ "id": "model-1" }))
    }

    async fn describe(
        State(state): State<Shared>,
        Path(name): Path<String>,
    ) -> Result<Json<EndpointDescription>, (StatusCode, Json<serde_json::Value>)> {
        let state = state.lock().unwrap();
        match state.endpoints.get(&name) {
            Some(desc) => Ok(Json(desc.clone())),
            None => Err(validation(format!("Could not find endpoint \"{}\".", name))),
        }
    }

    async fn update(
        State(state): State<Shared>,
        Path(name): Path<String>,
        Json(body): Json<serde_json::Value>,
    ) -> Result<StatusCode, (StatusCode, Json<serde_json::Value>)> {
        let mut state = state.lock().unwrap();
        let Some(desc) = state.endpoints.get_mut(&name) else {
            return Err(validation(format!("Could not find endpoint \"{}\".", name)));
        };
        if desc.status.is_transitioning() {
            return Err(validation(format!(
                "Cannot update in-progress endpoint \"{}\".",
                name
            )));
        }
        desc.config_name = body["config_name"].as_str().unwrap().to_string();
        desc.status = EndpointStatus::InService;
        Ok(StatusCode::OK)
    }

    async fn broken() -> (StatusCode, &'static str) {
        (StatusCode::BAD_GATEWAY, "upstream exploded")
    }

    async fn spawn_fake(state: Shared) -> String {
        let app = Router::new()
            .route("/models", post(create_model))
            .route("/endpoint-configs", post(broken))
            .route("/endpoints/{name}", get(describe).put(update))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(url: String, api_key: Option<&str>) -> HttpControlPlane {
        HttpControlPlane::new(
            &ControlPlaneConfig {
                url,
                api_key: api_key.map(String::from),
                timeout_secs: 5,
            },
            Duration::from_millis(5),
        )
        .unwrap()
    }

    fn endpoint(status: EndpointStatus) -> EndpointDescription {
        EndpointDescription {
            name: "ep".to_string(),
            config_name: "ep-config-old".to_string(),
            status,
            failure_reason: None,
        }
    }

    #[tokio::test]
    async fn test_create_model_sends_spec_and_bearer_token() {
        let state = Shared::default();
        let cp = client(spawn_fake(state.clone()).await, Some("cp-token"));

        let spec = ModelSpec {
            name: "news-headlines-2024-01-01T00-00-00".to_string(),
            artifact_reference: "pkg-42".to_string(),
            execution_role: "arn:role/exec".to_string(),
        };
        let handle = cp.create_model(&spec).await.unwrap();

        assert_eq!(handle.id, "model-1");
        assert_eq!(handle.name, spec.name);
        let state = state.lock().unwrap();
        assert_eq!(state.models, vec![spec]);
        assert_eq!(state.auth_headers, vec![Some("Bearer cp-token".to_string())]);
    }

    #[tokio::test]
    async fn test_describe_missing_endpoint_is_validation_exception() {
        let cp = client(spawn_fake(Shared::default()).await, None);

        let err = cp.describe_endpoint("ep").await.unwrap_err();

        assert_eq!(err.code(), Some(VALIDATION_EXCEPTION));
        assert!(err.message().unwrap().contains("Could not find endpoint"));
    }

    #[tokio::test]
    async fn test_update_busy_endpoint_is_rejected() {
        let state = Shared::default();
        state
            .lock()
            .unwrap()
            .endpoints
            .insert("ep".to_string(), endpoint(EndpointStatus::Updating));
        let cp = client(spawn_fake(state).await, None);

        let err = cp.update_endpoint("ep", "ep-config-new").await.unwrap_err();

        assert_eq!(err.code(), Some(VALIDATION_EXCEPTION));
        assert!(err
            .message()
            .unwrap()
            .contains("Cannot update in-progress endpoint"));
    }

    #[tokio::test]
    async fn test_update_then_wait_until_healthy() {
        let state = Shared::default();
        state
            .lock()
            .unwrap()
            .endpoints
            .insert("ep".to_string(), endpoint(EndpointStatus::InService));
        let cp = client(spawn_fake(state).await, None);

        cp.update_endpoint("ep", "ep-config-new").await.unwrap();
        let desc = cp
            .wait_until_healthy("ep", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(desc.status, EndpointStatus::InService);
        assert_eq!(desc.config_name, "ep-config-new");
    }

    #[tokio::test]
    async fn test_non_json_error_body_becomes_http_error() {
        let cp = client(spawn_fake(Shared::default()).await, None);

        let spec = EndpointConfigSpec {
            name: "cfg".to_string(),
            variants: vec![],
        };
        let err = cp.create_endpoint_config(&spec).await.unwrap_err();

        assert_eq!(err.code(), Some("HttpError"));
        assert!(err.message().unwrap().contains("502"));
        assert!(err.message().unwrap().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let cp = client("http://127.0.0.1:1".to_string(), None);

        let err = cp.describe_endpoint("ep").await.unwrap_err();

        assert!(matches!(err, ControlPlaneError::Transport(_)));
    }
}
