//! Metrics collection and exposition.
//!
//! # Metrics
//! - `testforge_requests_total` (counter): requests by operation, outcome
//! - `testforge_request_duration_seconds` (histogram): request latency
//! - `testforge_probe_attempts_total` (counter): liveness probes by result
//! - `testforge_failed_attempts_total` (counter): failed attempts of any kind
//! - `testforge_connection_state` (gauge): 0=disconnected 1=probing 2=connected 3=degraded
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(operation: &'static str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!("testforge_requests_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("testforge_request_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

pub fn record_probe(result: &'static str) {
    metrics::counter!("testforge_probe_attempts_total", "result" => result).increment(1);
}

pub fn record_failure() {
    metrics::counter!("testforge_failed_attempts_total").increment(1);
}

pub fn record_connection_state(code: u8) {
    metrics::gauge!("testforge_connection_state").set(f64::from(code));
}
