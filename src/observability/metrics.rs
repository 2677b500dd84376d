//! Metrics collection and exposition.
//!
//! # Metrics
//! - `config_manager_rollout_checks_total` (counter): rollout checks by outcome
//! - `config_manager_update_failures_total` (counter): failed updates by stage
//! - `config_manager_snapshot_commits_total` (counter): committed snapshots
//! - `config_manager_snapshot_info` (gauge): 1 for the committed config id
//!
//! Recording is a no-op until a recorder is installed.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rollout_check(outcome: &'static str) {
    counter!("config_manager_rollout_checks_total", "outcome" => outcome).increment(1);
}

pub fn record_update_failure(stage: &'static str) {
    counter!("config_manager_update_failures_total", "stage" => stage).increment(1);
}

/// Count a commit and move the info gauge from `previous` to `config_id`.
pub fn record_snapshot_commit(service: &str, previous: Option<&str>, config_id: &str) {
    counter!("config_manager_snapshot_commits_total", "service" => service.to_string()).increment(1);
    if let Some(previous) = previous.filter(|p| *p != config_id) {
        gauge!(
            "config_manager_snapshot_info",
            "service" => service.to_string(),
            "config_id" => previous.to_string()
        )
        .set(0.0);
    }
    gauge!(
        "config_manager_snapshot_info",
        "service" => service.to_string(),
        "config_id" => config_id.to_string()
    )
    .set(1.0);
}
