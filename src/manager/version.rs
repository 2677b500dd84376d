//! Active configuration version and change detection.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::config::ChangeDetection;
use crate::service::types::FetchResult;

/// The active (rollout id, config id) pair.
///
/// Both ids are empty only before bootstrap has resolved a version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ConfigVersion {
    pub rollout_id: String,
    pub config_id: String,
}

impl ConfigVersion {
    pub fn new(rollout_id: impl Into<String>, config_id: impl Into<String>) -> Self {
        Self {
            rollout_id: rollout_id.into(),
            config_id: config_id.into(),
        }
    }

    /// A version with a config id and no rollout, as used by the fixed strategy.
    pub fn fixed(config_id: impl Into<String>) -> Self {
        Self::new(String::new(), config_id)
    }

    pub fn is_unset(&self) -> bool {
        self.rollout_id.is_empty() && self.config_id.is_empty()
    }
}

impl fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rollout={:?} config={:?}", self.rollout_id, self.config_id)
    }
}

impl ChangeDetection {
    /// Whether moving from `current` to `resolved` requires a new snapshot.
    pub fn is_change(self, current: &ConfigVersion, resolved: &ConfigVersion) -> bool {
        let rollout_changed = current.rollout_id != resolved.rollout_id;
        let config_changed = current.config_id != resolved.config_id;
        match self {
            ChangeDetection::Either => rollout_changed || config_changed,
            ChangeDetection::Both => rollout_changed && config_changed,
        }
    }
}

/// Resolves the currently active configuration version of a service.
///
/// Errors describe only failures of the lookup itself.
#[async_trait]
pub trait VersionTracker: Send + Sync {
    /// Returns the previous pair unchanged when no newer rollout exists.
    async fn resolve(
        &self,
        service: &str,
        previous_rollout_id: &str,
        previous_config_id: &str,
    ) -> FetchResult<ConfigVersion>;
}
