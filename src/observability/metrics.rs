//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, outcome
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_refresh_total` (counter): domain source polls by result
//! - `proxy_routing_table_entries` (gauge): size of the installed snapshot
//! - `proxy_active_connections` (gauge): current connection count
//!
//! Recording is a no-op until a recorder is installed, so the proxy and
//! its tests run fine without [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record one domain source poll.
pub fn record_refresh(result: &'static str) {
    metrics::counter!("proxy_refresh_total", "result" => result).increment(1);
}

pub fn set_routing_table_entries(entries: usize) {
    metrics::gauge!("proxy_routing_table_entries").set(entries as f64);
}

pub fn connection_opened() {
    metrics::gauge!("proxy_active_connections").increment(1.0);
}

pub fn connection_closed() {
    metrics::gauge!("proxy_active_connections").decrement(1.0);
}
