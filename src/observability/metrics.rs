//! Metrics emitted by the decision slot.
//!
//! # Metrics
//! - `retry_decisions_total` (counter): decisions by outcome and reason
//! - `retry_authorization_cycles_total` (counter): re-authorization runs by result
//! - `retry_authorization_joined_total` (counter): requests that joined an in-flight run
//! - `retry_authorization_reused_total` (counter): requests approved by a completed run

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install a Prometheus recorder with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

pub fn record_decision(retry: bool, reason: &'static str) {
    let outcome = if retry { "retry" } else { "refuse" };
    ::metrics::counter!("retry_decisions_total", "outcome" => outcome, "reason" => reason).increment(1);
}

pub fn record_authorization_cycle(result: &'static str) {
    ::metrics::counter!("retry_authorization_cycles_total", "result" => result).increment(1);
}

pub fn record_authorization_joined() {
    ::metrics::counter!("retry_authorization_joined_total").increment(1);
}

pub fn record_authorization_reused() {
    ::metrics::counter!("retry_authorization_reused_total").increment(1);
}
