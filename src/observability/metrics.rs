//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by route, status
//! - `relay_request_duration_seconds` (histogram): time to response headers
//! - `relay_sessions_total` (counter): stream sessions by outcome
//! - `relay_bytes_total` (counter): body bytes handed to clients
//! - `relay_access_denied_total` (counter): guard and token rejections by reason

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    ::metrics::counter!(
        "relay_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("relay_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_session(outcome: &'static str, bytes: u64) {
    ::metrics::counter!("relay_sessions_total", "outcome" => outcome).increment(1);
    ::metrics::counter!("relay_bytes_total").increment(bytes);
}

pub fn record_access_denied(reason: &'static str) {
    ::metrics::counter!("relay_access_denied_total", "reason" => reason).increment(1);
}
