//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, host
//! - `proxy_request_duration_seconds` (histogram): primary path latency
//! - `proxy_replays_total` (counter): replays by outcome
//! - `proxy_replay_duration_seconds` (histogram): replay latency
//! - `proxy_replays_dropped_total` (counter): replays dropped on saturation
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter serves its own listener, separate from proxy traffic

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one completed primary request.
pub fn record_request(method: &str, status: u16, host: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("host", host.to_string()),
    ];
    counter!("proxy_requests_total", &labels).increment(1);
    histogram!("proxy_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// Record one finished replay attempt.
pub fn record_replay(outcome: &'static str, start: Instant) {
    counter!("proxy_replays_total", "outcome" => outcome).increment(1);
    histogram!("proxy_replay_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record a replay dropped because the in-flight bound was reached.
pub fn record_replay_dropped() {
    counter!("proxy_replays_dropped_total").increment(1);
}
