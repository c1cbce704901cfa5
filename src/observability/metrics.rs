//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): completed responses by method, status
//! - `gateway_request_duration_seconds` (histogram): request start to body end
//! - `gateway_blocked_requests_total` (counter): admission rejections
//! - `gateway_store_errors_total` (counter): failed store calls by operation
//! - `gateway_blocklist_size` (gauge): addresses in the current snapshot
//! - `gateway_blocklist_refresh_total` (counter): refreshes by outcome
//!
//! Updates are no-ops until `init_metrics` installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_blocked() {
    counter!("gateway_blocked_requests_total").increment(1);
}

pub fn record_store_error(operation: &'static str) {
    counter!("gateway_store_errors_total", "operation" => operation).increment(1);
}

pub fn record_blocklist_size(size: usize) {
    gauge!("gateway_blocklist_size").set(size as f64);
}

pub fn record_blocklist_refresh(outcome: &'static str) {
    counter!("gateway_blocklist_refresh_total", "outcome" => outcome).increment(1);
}
