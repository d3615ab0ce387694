//! Metrics collection and exposition.
//!
//! # Metrics
//! - `charset_requests_total` (counter): requests by mode (`legacy`, `passthrough`)
//! - `charset_transcode_errors_total` (counter): failures by direction (`decode`, `encode`)
//! - `charset_rejected_requests_total` (counter): requests refused before the handler, by status
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exporter is optional and only wired by the demo server

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count a request by whether legacy mode applied.
pub fn record_request(legacy: bool) {
    let mode = if legacy { "legacy" } else { "passthrough" };
    metrics::counter!("charset_requests_total", "mode" => mode).increment(1);
}

/// Count a transcoding failure; `direction` is `decode` or `encode`.
pub fn record_transcode_error(direction: &'static str) {
    metrics::counter!("charset_transcode_errors_total", "direction" => direction).increment(1);
}

/// Count a request answered by the middleware itself.
pub fn record_rejected(status: u16) {
    metrics::counter!("charset_rejected_requests_total", "status" => status.to_string()).increment(1);
}
