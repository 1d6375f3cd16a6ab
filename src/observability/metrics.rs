//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ws_admission_attempts_total` (counter): admission decisions made
//! - `ws_admissions_rejected_total` (counter): rejections by reason
//! - `ws_active_connections` (gauge): current connection count
//! - `ws_messages_total` (counter): processed messages by kind
//! - `ws_rate_limited_total` (counter): messages refused by the limiter
//! - `ws_heartbeats_sent_total` (counter): heartbeat frames delivered

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admission() {
    counter!("ws_admission_attempts_total").increment(1);
}

pub fn record_rejection(reason: &'static str) {
    counter!("ws_admissions_rejected_total", "reason" => reason).increment(1);
}

pub fn set_active_connections(count: usize) {
    gauge!("ws_active_connections").set(count as f64);
}

pub fn record_message(kind: &'static str) {
    counter!("ws_messages_total", "kind" => kind).increment(1);
}

pub fn record_rate_limited() {
    counter!("ws_rate_limited_total").increment(1);
}

pub fn record_heartbeat(delivered: usize) {
    counter!("ws_heartbeats_sent_total").increment(delivered as u64);
}
