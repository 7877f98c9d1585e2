//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): forwarded requests by method, status, upstream
//! - `proxy_request_duration_seconds` (histogram): latency per upstream
//! - `proxy_route_misses_total` (counter): requests with no matching route
//! - `proxy_dedup_decisions_total` (counter): gate outcomes by decision
//! - `proxy_reports_total` (counter): report deliveries by outcome
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, upstream: &str, start: Instant) {
    ::metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "upstream" => upstream.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "proxy_request_duration_seconds",
        "upstream" => upstream.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_route_miss() {
    ::metrics::counter!("proxy_route_misses_total").increment(1);
}

/// `decision` is one of: fresh, duplicate, lost, no_session, error.
pub fn record_dedup(decision: &'static str) {
    ::metrics::counter!("proxy_dedup_decisions_total", "decision" => decision).increment(1);
}

/// `outcome` is one of: delivered, failed.
pub fn record_report(outcome: &'static str) {
    ::metrics::counter!("proxy_reports_total", "outcome" => outcome).increment(1);
}
