//! Model approval notification entry point.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::Value;

use promoter_core::{TriggerError, TriggerOutcome};

use super::handlers::ErrorResponse;
use crate::state::AppState;

/// Handles one approval notification. Skipped notifications still succeed.
pub async fn handle_approval(
    State(state): State<Arc<AppState>>,
    Json(event): Json<Value>,
) -> Result<Json<TriggerOutcome>, impl IntoResponse> {
    state.trigger().handle(&event).await.map(Json).map_err(|e| {
        let status = match &e {
            TriggerError::UnexpectedEvent(_) => StatusCode::BAD_REQUEST,
            TriggerError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ErrorResponse {
            error: e.to_string(),
            kind: e.kind(),
        }
        .into_response_with(status)
    })
}
