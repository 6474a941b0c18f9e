//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relayed requests by outcome (`success` or an error kind)
//! - `relay_request_duration_seconds` (histogram): time from request event to envelope
//! - `relay_sessions_active` (gauge): sessions currently in the registry
//! - `relay_channel_events_total` (counter): channel events by name
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(outcome: &'static str, start: Instant) {
    metrics::counter!("relay_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_sessions(count: usize) {
    metrics::gauge!("relay_sessions_active").set(count as f64);
}

pub fn record_channel_event(event: &'static str) {
    metrics::counter!("relay_channel_events_total", "event" => event).increment(1);
}
