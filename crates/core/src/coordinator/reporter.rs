//! Exactly-once job outcome reporting.

use std::sync::Arc;

use tracing::{info, warn};

use crate::metrics;

use super::types::{CoordinatorError, FailureDetails, PipelineCoordinator};

/// Longest failure message sent to the coordinator, in characters.
pub const MAX_FAILURE_MESSAGE_CHARS: usize = 5000;

/// Reports the outcome of one pipeline job.
///
/// Both report methods consume the reporter, so a job can be reported at
/// most once. A failed delivery is returned to the caller and never retried
/// as the opposite outcome.
pub struct JobReporter {
    coordinator: Arc<dyn PipelineCoordinator>,
    job_id: String,
}

impl JobReporter {
    pub fn new(coordinator: Arc<dyn PipelineCoordinator>, job_id: impl Into<String>) -> Self {
        Self {
            coordinator,
            job_id: job_id.into(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub async fn succeed(self) -> Result<(), CoordinatorError> {
        let result = self.coordinator.report_job_success(&self.job_id).await;
        record("success", &result);
        match &result {
            Ok(()) => info!(job_id = %self.job_id, "Reported job success"),
            Err(e) => warn!(job_id = %self.job_id, error = %e, "Failed to report job success"),
        }
        result
    }

    /// Reports failure with `summary` followed by `trace` on the next line.
    pub async fn fail(self, summary: &str, trace: &str) -> Result<(), CoordinatorError> {
        let details = FailureDetails::job_failed(failure_message(summary, trace));
        let result = self
            .coordinator
            .report_job_failure(&self.job_id, &details)
            .await;
        record("failure", &result);
        match &result {
            Ok(()) => info!(job_id = %self.job_id, "Reported job failure"),
            Err(e) => warn!(job_id = %self.job_id, error = %e, "Failed to report job failure"),
        }
        result
    }
}

fn record(outcome: &str, result: &Result<(), CoordinatorError>) {
    let delivered = if result.is_ok() { "true" } else { "false" };
    metrics::JOB_REPORTS
        .with_label_values(&[outcome, delivered])
        .inc();
}

fn failure_message(summary: &str, trace: &str) -> String {
    let message = if trace.is_empty() {
        summary.to_string()
    } else {
        format!("{}\n{}", summary, trace)
    };
    match message.char_indices().nth(MAX_FAILURE_MESSAGE_CHARS) {
        Some((end, _)) => message[..end].to_string(),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPipelineCoordinator, RecordedReport};

    #[tokio::test]
    async fn test_succeed_reports_once() {
        let coordinator = Arc::new(MockPipelineCoordinator::new());
        let reporter = JobReporter::new(coordinator.clone(), "job-1");

        reporter.succeed().await.unwrap();

        assert_eq!(
            coordinator.reports().await,
            vec![RecordedReport::Success {
                job_id: "job-1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_fail_joins_summary_and_trace() {
        let coordinator = Arc::new(MockPipelineCoordinator::new());
        let reporter = JobReporter::new(coordinator.clone(), "job-1");

        reporter
            .fail("endpoint busy", "caused by: ValidationException")
            .await
            .unwrap();

        assert_eq!(
            coordinator.reports().await,
            vec![RecordedReport::Failure {
                job_id: "job-1".to_string(),
                details: FailureDetails::job_failed(
                    "endpoint busy\ncaused by: ValidationException"
                ),
            }]
        );
    }

    #[tokio::test]
    async fn test_delivery_error_is_returned() {
        let coordinator = Arc::new(MockPipelineCoordinator::new());
        coordinator
            .set_next_error(CoordinatorError::Timeout)
            .await;
        let reporter = JobReporter::new(coordinator.clone(), "job-1");

        let err = reporter.succeed().await.unwrap_err();

        assert!(matches!(err, CoordinatorError::Timeout));
        assert!(coordinator.reports().await.is_empty());
    }

    #[test]
    fn test_failure_message_is_truncated_on_char_boundary() {
        let summary = "é".repeat(MAX_FAILURE_MESSAGE_CHARS + 10);
        let message = failure_message(&summary, "");
        assert_eq!(message.chars().count(), MAX_FAILURE_MESSAGE_CHARS);

        let short = failure_message("short", "");
        assert_eq!(short, "short");
    }
}
