//! Prometheus metrics for monitoring the league server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener
//! (`METRICS_BIND`). Without an installed exporter every call here is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: request counts and durations by route template
//! - **Competition Metrics**: failed operations by error kind

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Competition Metrics
// ============================================================================

/// Count a failed competition operation by error kind and class.
pub fn competition_errors_total(kind: &'static str, class: &'static str) {
    metrics::counter!("competition_errors_total",
        "kind" => kind,
        "class" => class
    )
    .increment(1);
}
