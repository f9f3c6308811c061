//! Endpoint reconciliation.
//!
//! Brings the stable, long-lived endpoint to a freshly registered model:
//! a new immutable endpoint configuration is created on every attempt and
//! the endpoint is created or repointed at it. An endpoint already
//! converging toward another configuration is never touched.

mod classify;
mod runner;
mod state;
mod types;

pub use classify::{
    classify, EndpointFault, EndpointOperation, ENDPOINT_BUSY_MARKER, ENDPOINT_NOT_FOUND_MARKER,
};
pub use runner::{EndpointReconciler, ReconcileSettings};
pub use state::{
    format_trail, AbortReason, Branch, ConvergenceFailure, InvalidTransition, ReconcileState,
    Step, StepOutcome,
};
pub use types::{ReconcileError, ReconcileReport, ReconcileSummary};
