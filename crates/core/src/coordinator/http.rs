//! HTTP pipeline coordinator client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use crate::config::CoordinatorConfig;

use super::types::{CoordinatorError, FailureDetails, PipelineCoordinator};

/// Coordinator reached over HTTP.
///
/// Routes:
/// - `POST /jobs/{id}/success`
/// - `POST /jobs/{id}/failure` with a [`FailureDetails`] body
pub struct HttpPipelineCoordinator {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPipelineCoordinator {
    pub fn new(config: &CoordinatorConfig) -> Result<Self, CoordinatorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| CoordinatorError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn post(&self, job_id: &str, outcome: &str) -> RequestBuilder {
        let url = format!(
            "{}/jobs/{}/{}",
            self.base_url,
            urlencoding::encode(job_id),
            outcome
        );
        let builder = self.client.post(url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<(), CoordinatorError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CoordinatorError::Timeout
            } else {
                CoordinatorError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, "Coordinator rejected report");
        Err(CoordinatorError::Rejected {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl PipelineCoordinator for HttpPipelineCoordinator {
    fn name(&self) -> &str {
        "http"
    }

    async fn report_job_success(&self, job_id: &str) -> Result<(), CoordinatorError> {
        self.send(self.post(job_id, "success")).await
    }

    async fn report_job_failure(
        &self,
        job_id: &str,
        details: &FailureDetails,
    ) -> Result<(), CoordinatorError> {
        self.send(self.post(job_id, "failure").json(details)).await
    }
}
