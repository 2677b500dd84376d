//! Service identity resolution at bootstrap.
//!
//! # Resolution Order
//! ```text
//! service name:      explicit → metadata (when enabled and present) → error
//! rollout strategy:  explicit → metadata (best-effort) → fixed
//! fixed config id:   explicit → metadata (when enabled and present) → error
//! ```
//!
//! Managed deployments take their initial config id from the version tracker,
//! see `ConfigManager::bootstrap`.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ManagerConfig;
use crate::manager::error::{ManagerError, ManagerResult};
use crate::service::metadata::MetadataSource;

/// How the active configuration version is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloutStrategy {
    /// The config id is fixed for the process lifetime.
    Fixed,
    /// The config id follows the service's rollouts.
    Managed,
}

impl RolloutStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RolloutStrategy::Fixed => "fixed",
            RolloutStrategy::Managed => "managed",
        }
    }
}

impl FromStr for RolloutStrategy {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(RolloutStrategy::Fixed),
            "managed" => Ok(RolloutStrategy::Managed),
            other => Err(ManagerError::InvalidRolloutStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for RolloutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who the manager manages configuration for. Fixed once bootstrap completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceIdentity {
    pub service_name: String,
    pub rollout_strategy: RolloutStrategy,
}

/// Resolves identity values from explicit configuration and the metadata server.
pub struct IdentityResolver<'a> {
    config: &'a ManagerConfig,
    metadata: Option<Arc<dyn MetadataSource>>,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(config: &'a ManagerConfig, metadata: Option<Arc<dyn MetadataSource>>) -> Self {
        Self { config, metadata }
    }

    /// The metadata source, if metadata checking is enabled and one exists.
    fn metadata(&self) -> Option<&dyn MetadataSource> {
        if self.config.check_metadata {
            self.metadata.as_deref()
        } else {
            None
        }
    }

    /// Explains why a required value has no metadata fallback.
    fn missing_reason(&self) -> &'static str {
        if !self.config.check_metadata {
            "required because metadata fetching is disabled"
        } else {
            "required on a deployment without a metadata server"
        }
    }

    pub async fn resolve_identity(&self) -> ManagerResult<ServiceIdentity> {
        let service_name = self.resolve_service_name().await?;
        let rollout_strategy = self.resolve_rollout_strategy().await?;
        Ok(ServiceIdentity {
            service_name,
            rollout_strategy,
        })
    }

    pub async fn resolve_service_name(&self) -> ManagerResult<String> {
        if let Some(name) = non_empty(&self.config.service_name) {
            return Ok(name.to_string());
        }

        let metadata = self.metadata().ok_or_else(|| {
            ManagerError::IdentityResolution(format!(
                "service name is not specified, {}",
                self.missing_reason()
            ))
        })?;

        match metadata.fetch_service_name().await {
            Ok(name) if !name.is_empty() => Ok(name),
            Ok(_) => Err(ManagerError::IdentityResolution(
                "metadata key endpoints-service-name is empty".to_string(),
            )),
            Err(e) => Err(ManagerError::IdentityResolution(format!(
                "failed to read metadata key endpoints-service-name: {}",
                e
            ))),
        }
    }

    pub async fn resolve_rollout_strategy(&self) -> ManagerResult<RolloutStrategy> {
        if let Some(strategy) = non_empty(&self.config.rollout_strategy) {
            return strategy.parse();
        }

        if let Some(metadata) = self.metadata() {
            match metadata.fetch_rollout_strategy().await {
                Ok(strategy) if !strategy.is_empty() => return strategy.parse(),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Rollout strategy not available from metadata, using fixed");
                }
            }
        }

        Ok(RolloutStrategy::Fixed)
    }

    /// Initial config id under the fixed strategy.
    pub async fn resolve_fixed_config_id(&self) -> ManagerResult<String> {
        if let Some(config_id) = non_empty(&self.config.config_id) {
            return Ok(config_id.to_string());
        }

        let metadata = self.metadata().ok_or_else(|| {
            ManagerError::IdentityResolution(format!(
                "service config id is not specified, {}",
                self.missing_reason()
            ))
        })?;

        match metadata.fetch_config_id().await {
            Ok(config_id) if !config_id.is_empty() => Ok(config_id),
            Ok(_) => Err(ManagerError::IdentityResolution(
                "metadata key endpoints-service-config-id is empty".to_string(),
            )),
            Err(e) => Err(ManagerError::IdentityResolution(format!(
                "failed to read metadata key endpoints-service-config-id: {}",
                e
            ))),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
