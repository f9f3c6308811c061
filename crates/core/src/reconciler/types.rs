//! Types for the endpoint reconciler.

use serde::Serialize;
use thiserror::Error;

use crate::control_plane::{ControlPlaneError, EndpointDescription};

use super::state::{Branch, InvalidTransition, ReconcileState};

/// A converged endpoint.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub endpoint_name: String,
    pub config_name: String,
    pub branch: Branch,
    /// Endpoint as last described, `InService` on `config_name`.
    pub description: EndpointDescription,
    /// States visited, from `Start` to `Converged`.
    pub trail: Vec<ReconcileState>,
}

/// Summary of a report suitable for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileSummary {
    pub endpoint_name: String,
    pub config_name: String,
    pub branch: Branch,
}

impl From<&ReconcileReport> for ReconcileSummary {
    fn from(report: &ReconcileReport) -> Self {
        Self {
            endpoint_name: report.endpoint_name.clone(),
            config_name: report.config_name.clone(),
            branch: report.branch,
        }
    }
}

/// Errors that end a reconciliation attempt.
///
/// Every variant except `InvalidTransition` carries the states visited so
/// the failure can be diagnosed from the job report alone.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The new endpoint configuration was rejected.
    #[error("Failed to create endpoint configuration {config_name}: {source}")]
    ConfigurationRejected {
        config_name: String,
        #[source]
        source: ControlPlaneError,
        trail: Vec<ReconcileState>,
    },

    /// The endpoint is mid-transition toward another configuration.
    #[error("Endpoint {endpoint} is already updating: {source}")]
    Conflict {
        endpoint: String,
        #[source]
        source: ControlPlaneError,
        trail: Vec<ReconcileState>,
    },

    /// A probe, create or update was rejected for an unrecognized reason.
    #[error("Endpoint {endpoint} request failed: {source}")]
    EndpointFault {
        endpoint: String,
        #[source]
        source: ControlPlaneError,
        trail: Vec<ReconcileState>,
    },

    #[error("{source}")]
    ConvergenceTimeout {
        endpoint: String,
        #[source]
        source: ControlPlaneError,
        trail: Vec<ReconcileState>,
    },

    #[error("{source}")]
    ConvergenceFailed {
        endpoint: String,
        #[source]
        source: ControlPlaneError,
        trail: Vec<ReconcileState>,
    },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl ReconcileError {
    /// States visited before the attempt ended.
    pub fn trail(&self) -> &[ReconcileState] {
        match self {
            ReconcileError::ConfigurationRejected { trail, .. }
            | ReconcileError::Conflict { trail, .. }
            | ReconcileError::EndpointFault { trail, .. }
            | ReconcileError::ConvergenceTimeout { trail, .. }
            | ReconcileError::ConvergenceFailed { trail, .. } => trail,
            ReconcileError::InvalidTransition(_) => &[],
        }
    }

    /// The control plane error that ended the attempt, if any.
    pub fn control_plane_error(&self) -> Option<&ControlPlaneError> {
        match self {
            ReconcileError::ConfigurationRejected { source, .. }
            | ReconcileError::Conflict { source, .. }
            | ReconcileError::EndpointFault { source, .. }
            | ReconcileError::ConvergenceTimeout { source, .. }
            | ReconcileError::ConvergenceFailed { source, .. } => Some(source),
            ReconcileError::InvalidTransition(_) => None,
        }
    }
}
