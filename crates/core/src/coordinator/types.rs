//! Types for pipeline job reporting.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure type reported for every failed deployment job.
pub const JOB_FAILED: &str = "JobFailed";

/// Errors returned when reporting a job outcome.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Coordinator rejected report ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Connection failed: {0}")]
    Transport(String),

    #[error("Request timeout")]
    Timeout,
}

/// Body of a failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl FailureDetails {
    pub fn job_failed(message: impl Into<String>) -> Self {
        Self {
            kind: JOB_FAILED.to_string(),
            message: message.into(),
        }
    }
}

/// Receives the terminal outcome of pipeline jobs.
#[async_trait]
pub trait PipelineCoordinator: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    /// Marks the job succeeded.
    async fn report_job_success(&self, job_id: &str) -> Result<(), CoordinatorError>;

    /// Marks the job failed.
    async fn report_job_failure(
        &self,
        job_id: &str,
        details: &FailureDetails,
    ) -> Result<(), CoordinatorError>;
}
