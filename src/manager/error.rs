//! Config manager error definitions.

use thiserror::Error;

use crate::service::types::FetchError;
use crate::snapshot::types::{BuildError, CommitError};

/// Errors raised while bootstrapping or refreshing the managed configuration.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Service name or config id could not be determined from any allowed source.
    #[error("identity resolution failed: {0}")]
    IdentityResolution(String),

    /// Rollout strategy is neither "fixed" nor "managed".
    #[error("invalid rollout strategy {0:?}: it must be either \"managed\" or \"fixed\"")]
    InvalidRolloutStrategy(String),

    /// The rollout check interval is zero.
    #[error("rollout check interval must be greater than zero")]
    InvalidCheckInterval,

    /// A remote config, rollout or metadata call failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The configuration document could not be turned into resources.
    #[error("failed to build snapshot: {0}")]
    Build(#[from] BuildError),

    /// The snapshot store rejected the new snapshot.
    #[error("failed to commit snapshot: {0}")]
    CacheCommit(#[from] CommitError),
}

impl ManagerError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ManagerError::IdentityResolution(_) => "identity_resolution",
            ManagerError::InvalidRolloutStrategy(_) => "invalid_rollout_strategy",
            ManagerError::InvalidCheckInterval => "invalid_check_interval",
            ManagerError::Fetch(_) => "fetch",
            ManagerError::Build(_) => "build",
            ManagerError::CacheCommit(_) => "commit",
        }
    }
}

/// Result type for config manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ManagerError::InvalidRolloutStrategy("canary".to_string());
        assert_eq!(
            err.to_string(),
            "invalid rollout strategy \"canary\": it must be either \"managed\" or \"fixed\""
        );

        let err = ManagerError::from(BuildError::NoApis("svc".to_string()));
        assert_eq!(err.to_string(), "failed to build snapshot: service config svc declares no APIs");
        assert_eq!(err.kind(), "build");
    }
}
