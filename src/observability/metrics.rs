//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by method, status, mode
//! - `relay_request_duration_seconds` (histogram): time to response headers
//! - `relay_active_streams` (gauge): event streams currently relayed
//! - `relay_auth_redirects_total` (counter): upstream redirects turned into 401
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// How a response left the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    Buffered,
    Streamed,
    Rejected,
}

impl ForwardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardMode::Buffered => "buffered",
            ForwardMode::Streamed => "streamed",
            ForwardMode::Rejected => "rejected",
        }
    }
}

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one proxied request.
pub fn record_request(method: &str, status: u16, mode: ForwardMode, start: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status,
        "mode" => mode.as_str(),
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "mode" => mode.as_str())
        .record(start.elapsed().as_secs_f64());
}

/// Record an upstream redirect that was converted to 401.
pub fn record_auth_redirect() {
    metrics::counter!("relay_auth_redirects_total").increment(1);
}

/// Tracks one relayed event stream for the `relay_active_streams` gauge.
#[derive(Debug)]
pub struct StreamGauge(());

impl StreamGauge {
    pub fn open() -> Self {
        metrics::gauge!("relay_active_streams").increment(1.0);
        Self(())
    }
}

impl Drop for StreamGauge {
    fn drop(&mut self) {
        metrics::gauge!("relay_active_streams").decrement(1.0);
    }
}
