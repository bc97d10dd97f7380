//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by branch and outcome
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_cache_lookups_total` (counter): tenant cache hit/miss
//! - `gateway_cache_entries` (gauge): current tenant cache size
//! - `gateway_rate_limited_total` (counter): rejected by the rate limiter
//! - `gateway_unknown_client_total` (counter): requests with no client identity
//! - `gateway_admission_rejected_total` (counter): lookups refused by the gate
//! - `gateway_lookup_errors_total` (counter): classified store failures
//! - `gateway_api_key_rejections_total` (counter): API-key denials by reason

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(branch: &'static str, outcome: &'static str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "branch" => branch,
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "branch" => branch)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("gateway_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("gateway_cache_entries").set(size as f64);
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_unknown_client() {
    counter!("gateway_unknown_client_total").increment(1);
}

pub fn record_admission_rejected() {
    counter!("gateway_admission_rejected_total").increment(1);
}

pub fn record_lookup_error(kind: &'static str) {
    counter!("gateway_lookup_errors_total", "kind" => kind).increment(1);
}

pub fn record_api_key_rejection(reason: &'static str) {
    counter!("gateway_api_key_rejections_total", "reason" => reason).increment(1);
}
