//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): responses by method, status
//! - `proxy_request_duration_seconds` (histogram): time from track to untrack
//! - `proxy_open_requests` (gauge): requests currently in the ledger
//! - `proxy_upstream_errors_total` (counter): forwarding failures by kind
//! - `proxy_closed_requests_total` (counter): closed requests by reason
//!
//! Recording is a no-op until a recorder is installed.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::http::lifecycle::CloseReason;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a response sent to the client.
pub fn record_response(method: &str, status: u16) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a request leaving the ledger.
pub fn record_completion(reason: CloseReason, duration: Duration) {
    let reason = match reason {
        CloseReason::Completed => "completed",
        CloseReason::ClientAborted => "client_aborted",
        CloseReason::UpstreamFailed => "upstream_failed",
    };
    metrics::counter!("proxy_closed_requests_total", "reason" => reason).increment(1);
    metrics::histogram!("proxy_request_duration_seconds").record(duration.as_secs_f64());
}

/// Record a forwarding failure.
pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("proxy_upstream_errors_total", "kind" => kind).increment(1);
}

pub fn request_opened() {
    metrics::gauge!("proxy_open_requests").increment(1.0);
}

pub fn request_closed() {
    metrics::gauge!("proxy_open_requests").decrement(1.0);
}
