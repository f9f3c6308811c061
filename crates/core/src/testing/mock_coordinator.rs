//! Mock pipeline coordinator for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::coordinator::{CoordinatorError, FailureDetails, PipelineCoordinator};

/// A delivered job report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedReport {
    Success { job_id: String },
    Failure { job_id: String, details: FailureDetails },
}

impl RecordedReport {
    pub fn job_id(&self) -> &str {
        match self {
            RecordedReport::Success { job_id } | RecordedReport::Failure { job_id, .. } => job_id,
        }
    }
}

/// Mock implementation of the PipelineCoordinator trait.
///
/// Only delivered reports are recorded; `attempt_count` also counts
/// reports failed via `set_next_error`.
#[derive(Debug)]
pub struct MockPipelineCoordinator {
    reports: Arc<RwLock<Vec<RecordedReport>>>,
    attempts: Arc<RwLock<usize>>,
    /// If set, the next report will fail with this error.
    next_error: Arc<RwLock<Option<CoordinatorError>>>,
}

impl Default for MockPipelineCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPipelineCoordinator {
    pub fn new() -> Self {
        Self {
            reports: Arc::new(RwLock::new(Vec::new())),
            attempts: Arc::new(RwLock::new(0)),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn reports(&self) -> Vec<RecordedReport> {
        self.reports.read().await.clone()
    }

    pub async fn success_count(&self) -> usize {
        self.reports
            .read()
            .await
            .iter()
            .filter(|r| matches!(r, RecordedReport::Success { .. }))
            .count()
    }

    pub async fn failure_count(&self) -> usize {
        self.reports
            .read()
            .await
            .iter()
            .filter(|r| matches!(r, RecordedReport::Failure { .. }))
            .count()
    }

    /// Reports attempted, delivered or not.
    pub async fn attempt_count(&self) -> usize {
        *self.attempts.read().await
    }

    /// Make the next report fail with the given error.
    pub async fn set_next_error(&self, error: CoordinatorError) {
        *self.next_error.write().await = Some(error);
    }

    async fn record(&self, report: RecordedReport) -> Result<(), CoordinatorError> {
        *self.attempts.write().await += 1;
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.reports.write().await.push(report);
        Ok(())
    }
}

#[async_trait]
impl PipelineCoordinator for MockPipelineCoordinator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn report_job_success(&self, job_id: &str) -> Result<(), CoordinatorError> {
        self.record(RecordedReport::Success {
            job_id: job_id.to_string(),
        })
        .await
    }

    async fn report_job_failure(
        &self,
        job_id: &str,
        details: &FailureDetails,
    ) -> Result<(), CoordinatorError> {
        self.record(RecordedReport::Failure {
            job_id: job_id.to_string(),
            details: details.clone(),
        })
        .await
    }
}
