//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): latency by method
//! - `http_active_connections` (gauge): current connection count
//! - `http_request_errors_total` (counter): rejected or failed requests by kind
//!
//! Without an installed recorder every call is a no-op, so tests and
//! library users pay nothing unless the exporter is enabled.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!("http_requests_total", "Requests answered, by method and status");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        metrics::Unit::Seconds,
        "Time from accept to response written"
    );
    metrics::describe_gauge!("http_active_connections", "Connections currently open");
    metrics::describe_counter!("http_request_errors_total", "Requests rejected or failed, by kind");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_error(kind: &'static str) {
    metrics::counter!("http_request_errors_total", "kind" => kind).increment(1);
}

pub fn connection_opened() {
    metrics::gauge!("http_active_connections").increment(1.0);
}

pub fn connection_closed() {
    metrics::gauge!("http_active_connections").decrement(1.0);
}
