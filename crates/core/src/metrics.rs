//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Deployments (results, reconcile branches, convergence time)
//! - Promotion trigger (events by outcome)
//! - External services (control plane requests, pipeline job reports)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Deployments
// =============================================================================

/// Deployment attempts by terminal result.
pub static DEPLOYMENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("promoter_deployments_total", "Total deployment attempts"),
        &["result"], // "success" or the error kind, e.g. "conflict"
    )
    .unwrap()
});

/// Reconcile branches taken.
pub static RECONCILE_BRANCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "promoter_reconcile_branches_total",
            "Endpoint create/update requests issued by the reconciler",
        ),
        &["branch"], // "create", "update"
    )
    .unwrap()
});

/// Time spent waiting for the endpoint to converge.
pub static CONVERGENCE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "promoter_convergence_duration_seconds",
            "Duration of the endpoint convergence wait",
        )
        .buckets(vec![
            30.0, 60.0, 120.0, 300.0, 600.0, 900.0, 1200.0, 1800.0, 3600.0,
        ]),
        &["result"], // "converged", "timeout", "failed"
    )
    .unwrap()
});

// =============================================================================
// Promotion trigger
// =============================================================================

/// Approval notifications by outcome.
pub static TRIGGER_EVENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "promoter_trigger_events_total",
            "Model approval notifications handled",
        ),
        &["outcome"], // "published", "skipped_family", "skipped_status", "rejected", "error"
    )
    .unwrap()
});

// =============================================================================
// External services
// =============================================================================

/// Control plane requests by operation and outcome.
pub static CONTROL_PLANE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "promoter_control_plane_requests_total",
            "Requests sent to the control plane",
        ),
        &["operation", "result"], // result: "success", "rejected", "error"
    )
    .unwrap()
});

/// Control plane request latency.
pub static CONTROL_PLANE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "promoter_control_plane_request_duration_seconds",
            "Duration of control plane requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .unwrap()
});

/// Pipeline job reports by outcome and whether the coordinator accepted them.
pub static JOB_REPORTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "promoter_job_reports_total",
            "Job outcomes reported to the pipeline coordinator",
        ),
        &["outcome", "delivered"], // outcome: "success", "failure"; delivered: "true", "false"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Deployments
        Box::new(DEPLOYMENTS_TOTAL.clone()),
        Box::new(RECONCILE_BRANCHES.clone()),
        Box::new(CONVERGENCE_DURATION.clone()),
        // Trigger
        Box::new(TRIGGER_EVENTS.clone()),
        // External services
        Box::new(CONTROL_PLANE_REQUESTS.clone()),
        Box::new(CONTROL_PLANE_DURATION.clone()),
        Box::new(JOB_REPORTS.clone()),
    ]
}
