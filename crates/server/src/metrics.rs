//! Prometheus metrics for observability.
//!
//! The server registry holds the HTTP request metrics recorded by
//! [`crate::api::middleware::metrics_middleware`] plus every deployment and
//! trigger metric exported by the core crate.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Label used for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
///
/// Job requests host a whole deployment, including the convergence wait,
/// so the buckets reach well past typical API latencies.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "promoter_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.005, 0.025, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0, 1800.0, 3600.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("promoter_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "promoter_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Core metrics (deployments, reconciliation, trigger, remote services)
    for metric in promoter_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use promoter_core::metrics::{DEPLOYMENTS_TOTAL, TRIGGER_EVENTS};

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("promoter_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_includes_core_metrics() {
        // Vec metrics only appear once a label set has been touched.
        HTTP_REQUEST_DURATION
            .with_label_values(&["POST", "/api/v1/jobs", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        DEPLOYMENTS_TOTAL.with_label_values(&["success"]).inc_by(0);
        TRIGGER_EVENTS.with_label_values(&["published"]).inc_by(0);

        let output = encode_metrics();

        assert!(output.contains("promoter_http_request_duration_seconds"));
        assert!(output.contains("promoter_http_requests_in_flight"));
        assert!(output.contains("promoter_deployments_total"));
        assert!(output.contains("promoter_trigger_events_total"));
    }
}
