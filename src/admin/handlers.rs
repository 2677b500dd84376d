use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::manager::RolloutStrategy;

#[derive(Debug, Serialize)]
pub struct ManagerStatus {
    pub version: &'static str,
    pub service_name: String,
    pub rollout_strategy: RolloutStrategy,
    pub rollout_id: String,
    pub config_id: String,
    /// Version of the snapshot proxies currently observe.
    pub snapshot_version: Option<String>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<ManagerStatus> {
    let identity = state.status.identity();
    let current = state.status.current_version();

    Json(ManagerStatus {
        version: env!("CARGO_PKG_VERSION"),
        service_name: identity.service_name.clone(),
        rollout_strategy: identity.rollout_strategy,
        rollout_id: current.rollout_id,
        config_id: current.config_id,
        snapshot_version: state.status.snapshot_version(),
    })
}
