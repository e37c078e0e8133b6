//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by method (extension verbs as `OTHER`), status, backend
//! - `gateway_request_duration_seconds` (histogram): latency by backend
//! - `gateway_backend_selections_total` (counter): selector decisions by backend
//! - `gateway_upstream_errors_total` (counter): failed upstream calls by backend, kind
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus exporter.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, backend: &'static str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method_label(method),
        "status" => status.to_string(),
        "backend" => backend,
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "backend" => backend)
        .record(start.elapsed().as_secs_f64());
}

/// Bounded `method` label; extension verbs collapse to `OTHER`.
fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "PATCH" => "PATCH",
        "OPTIONS" => "OPTIONS",
        "CONNECT" => "CONNECT",
        "TRACE" => "TRACE",
        _ => "OTHER",
    }
}

pub fn record_selection(backend: &'static str) {
    counter!("gateway_backend_selections_total", "backend" => backend).increment(1);
}

pub fn record_upstream_error(backend: &'static str, kind: &'static str) {
    counter!("gateway_upstream_errors_total", "backend" => backend, "kind" => kind).increment(1);
}
