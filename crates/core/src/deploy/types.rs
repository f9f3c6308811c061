//! Types for the deployer.

use std::error::Error as StdError;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::artifact::ArtifactError;
use crate::control_plane::EndpointStatus;
use crate::coordinator::CoordinatorError;
use crate::reconciler::{format_trail, Branch, ReconcileError};
use crate::registrar::RegistrationError;

/// Errors that end a deployment attempt.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The event carries no job id, so nothing can be reported.
    #[error("Invalid pipeline job event: {0}")]
    InvalidJobEvent(String),

    /// The job id is known but the rest of the job input is unusable.
    #[error("Invalid job input: {0}")]
    Configuration(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Deployment task panicked: {0}")]
    Panicked(String),

    /// The outcome could not be delivered to the coordinator.
    #[error("Failed to report job outcome: {0}")]
    Report(#[source] CoordinatorError),
}

impl DeployError {
    /// Stable snake_case label, used in metrics and API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::InvalidJobEvent(_) => "invalid_job_event",
            DeployError::Configuration(_) => "configuration",
            DeployError::Artifact(ArtifactError::NotFound(_)) => "artifact_not_found",
            DeployError::Artifact(ArtifactError::Malformed { .. }) => "malformed_artifact",
            DeployError::Artifact(ArtifactError::Storage(_)) => "storage",
            DeployError::Registration(_) => "registration",
            DeployError::Reconcile(e) => match e {
                ReconcileError::ConfigurationRejected { .. } => "endpoint_configuration",
                ReconcileError::Conflict { .. } => "conflict",
                ReconcileError::EndpointFault { .. } => "endpoint_fault",
                ReconcileError::ConvergenceTimeout { .. } => "convergence_timeout",
                ReconcileError::ConvergenceFailed { .. } => "convergence_failed",
                ReconcileError::InvalidTransition(_) => "invalid_transition",
            },
            DeployError::Panicked(_) => "panicked",
            DeployError::Report(_) => "report",
        }
    }

    /// Diagnostic detail sent after the summary in a failure report: the
    /// cause chain and, for reconciliation failures, the states visited.
    pub fn diagnostic_trace(&self) -> String {
        let mut lines = vec![format!("kind: {}", self.kind())];

        let mut seen = self.to_string();
        let mut cause = self.source();
        while let Some(err) = cause {
            let text = err.to_string();
            if !seen.contains(&text) {
                lines.push(format!("caused by: {}", text));
                seen = text;
            }
            cause = err.source();
        }

        if let DeployError::Reconcile(e) = self {
            if !e.trail().is_empty() {
                lines.push(format!("states: {}", format_trail(e.trail())));
            }
        }

        lines.join("\n")
    }
}

/// A deployment that converged and was reported.
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub job_id: String,
    pub attempt_id: Uuid,
    pub model_reference: String,
    pub model_name: String,
    pub endpoint_name: String,
    pub config_name: String,
    pub branch: Branch,
    pub status: EndpointStatus,
}
