//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_events_total` (counter): status events by `status`
//! - `dispatch_provider_attempts_total` (counter): provider calls by `provider`, `result`
//! - `dispatch_queue_depth` (gauge): messages waiting in the deferred queue
//! - `dispatch_breaker_open` (gauge): 1=open, 0=closed
//! - `dispatch_send_duration_seconds` (histogram): wall time of one `send`
//!
//! # Design Decisions
//! - Recording is always safe: without an installed exporter the macros are no-ops
//! - The Prometheus exporter serves its own HTTP listener, separate from the API

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::dispatch::DispatchStatus;

/// Install the Prometheus exporter. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_status(status: DispatchStatus) {
    counter!("dispatch_events_total", "status" => status.as_str()).increment(1);
}

pub fn record_provider_attempt(provider: &str, success: bool) {
    let result = if success { "ok" } else { "error" };
    counter!(
        "dispatch_provider_attempts_total",
        "provider" => provider.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("dispatch_queue_depth").set(depth as f64);
}

pub fn record_breaker_open(open: bool) {
    gauge!("dispatch_breaker_open").set(if open { 1.0 } else { 0.0 });
}

pub fn record_send_duration(start: Instant) {
    histogram!("dispatch_send_duration_seconds").record(start.elapsed().as_secs_f64());
}
