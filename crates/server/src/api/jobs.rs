//! Pipeline job entry point.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::Value;
use tracing::warn;

use promoter_core::{DeployError, DeployOutcome, ReconcileError};

use super::handlers::ErrorResponse;
use crate::state::AppState;

/// Runs one deployment attempt for a pipeline job event.
///
/// The request stays open until the attempt reaches a terminal state, which
/// includes the endpoint convergence wait. By then the job has already been
/// reported to the coordinator.
pub async fn run_job(
    State(state): State<Arc<AppState>>,
    Json(event): Json<Value>,
) -> Result<Json<DeployOutcome>, impl IntoResponse> {
    match state.deployer().run(&event).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            let status = status_for(&e);
            warn!(kind = e.kind(), status = status.as_u16(), "Job request failed");
            Err(ErrorResponse {
                error: e.to_string(),
                kind: e.kind(),
            }
            .into_response_with(status))
        }
    }
}

/// HTTP status for a failed deployment.
pub fn status_for(err: &DeployError) -> StatusCode {
    match err {
        DeployError::InvalidJobEvent(_) => StatusCode::BAD_REQUEST,
        DeployError::Reconcile(ReconcileError::Conflict { .. }) => StatusCode::CONFLICT,
        DeployError::Reconcile(ReconcileError::ConvergenceTimeout { .. }) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        DeployError::Reconcile(ReconcileError::ConvergenceFailed { .. }) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
