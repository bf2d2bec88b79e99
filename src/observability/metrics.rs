//! Metrics collection and exposition.
//!
//! # Metrics
//! - `broadcast_http_requests_total` (counter): requests by route and outcome code
//! - `broadcast_http_request_duration_seconds` (histogram): latency by route
//!
//! # Design Decisions
//! - Only serve mode records metrics; CLI runs are too short-lived to scrape
//! - Recording is a no-op until an exporter is installed

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Record one handled API request.
pub fn record_request(route: &'static str, code: &'static str, start: Instant) {
    metrics::counter!("broadcast_http_requests_total", "route" => route, "code" => code)
        .increment(1);
    metrics::histogram!("broadcast_http_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}
