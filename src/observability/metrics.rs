//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define dispatch metrics (requests, latency, forwards, misses)
//! - Track context store size and sweeps
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by mount, method, status
//! - `dispatch_request_duration_seconds` (histogram): latency distribution
//! - `dispatch_forwards_total` (counter): internal re-dispatches
//! - `dispatch_not_found_total` (counter): requests with no matching route
//! - `context_swept_total` (counter): bags removed by the sweeper
//! - `context_entries` (gauge): live request bags
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels for mount pattern, method and status code

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(mount: &str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "dispatch_requests_total",
        "mount" => mount.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "dispatch_request_duration_seconds",
        "mount" => mount.to_string(),
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_forward(mount: &str) {
    metrics::counter!("dispatch_forwards_total", "mount" => mount.to_string()).increment(1);
}

pub fn record_not_found(mount: &str) {
    metrics::counter!("dispatch_not_found_total", "mount" => mount.to_string()).increment(1);
}

pub fn record_sweep(removed: usize, remaining: usize) {
    metrics::counter!("context_swept_total").increment(removed as u64);
    metrics::gauge!("context_entries").set(remaining as f64);
}
