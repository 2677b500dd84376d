//! Config manager orchestration.
//!
//! # Responsibilities
//! - Resolve service identity and the initial config version
//! - Commit the first snapshot before the process reports ready
//! - Launch the rollout checker under the managed strategy
//! - Expose the current version for status reporting
//!
//! # Design Decisions
//! - Fail fast: any bootstrap error is fatal
//! - The version is written only by bootstrap and then by the rollout checker

use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::{GeneratorOptions, ManagerConfig};
use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::identity::{IdentityResolver, RolloutStrategy, ServiceIdentity};
use crate::manager::refresh::RefreshLoop;
use crate::manager::updater::SnapshotUpdater;
use crate::manager::version::{ConfigVersion, VersionTracker};
use crate::service::metadata::MetadataSource;
use crate::service::ConfigFetcher;
use crate::snapshot::{ClientIdentityKey, ResourceSnapshot, SnapshotBuilder, SnapshotStore};

/// External collaborators driven by the config manager.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn ConfigFetcher>,
    pub tracker: Arc<dyn VersionTracker>,
    pub builder: Arc<dyn SnapshotBuilder>,
    pub store: Arc<dyn SnapshotStore>,
    /// Absent on deployments without a metadata server.
    pub metadata: Option<Arc<dyn MetadataSource>>,
}

/// Tracks the active service configuration and keeps the snapshot store current.
pub struct ConfigManager {
    identity: ServiceIdentity,
    current: Arc<ArcSwap<ConfigVersion>>,
    store: Arc<dyn SnapshotStore>,
    node_key: ClientIdentityKey,
    refresh: Option<RefreshLoop>,
    task: Option<JoinHandle<()>>,
}

impl ConfigManager {
    /// Resolve identity and version, then build and commit the first snapshot.
    ///
    /// The rollout checker is prepared but not started; see [`ConfigManager::start`].
    pub async fn bootstrap(
        config: &ManagerConfig,
        options: GeneratorOptions,
        deps: Collaborators,
    ) -> ManagerResult<Self> {
        if config.check_interval().is_zero() {
            return Err(ManagerError::InvalidCheckInterval);
        }

        let resolver = IdentityResolver::new(config, deps.metadata.clone());
        let identity = resolver.resolve_identity().await?;

        let version = match identity.rollout_strategy {
            RolloutStrategy::Managed => {
                let resolved = deps.tracker.resolve(&identity.service_name, "", "").await?;
                if resolved.config_id.is_empty() {
                    return Err(ManagerError::IdentityResolution(format!(
                        "no active config id found in rollouts of service {}",
                        identity.service_name
                    )));
                }
                resolved
            }
            RolloutStrategy::Fixed => {
                ConfigVersion::fixed(resolver.resolve_fixed_config_id().await?)
            }
        };

        let updater = SnapshotUpdater::new(
            identity.service_name.clone(),
            options,
            deps.fetcher,
            deps.builder,
            deps.store.clone(),
            deps.metadata,
        );
        updater.update(&version.config_id).await?;

        tracing::info!(
            service = %identity.service_name,
            config_id = %version.config_id,
            rollout_strategy = %identity.rollout_strategy,
            "Created new config manager"
        );

        let node_key = updater.node_key().clone();
        let current = Arc::new(ArcSwap::from_pointee(version));
        let refresh = match identity.rollout_strategy {
            RolloutStrategy::Managed => Some(RefreshLoop::new(
                identity.service_name.clone(),
                config.check_interval(),
                config.change_detection,
                deps.tracker,
                updater,
                current.clone(),
            )),
            RolloutStrategy::Fixed => None,
        };

        Ok(Self {
            identity,
            current,
            store: deps.store,
            node_key,
            refresh,
            task: None,
        })
    }

    /// Launch the rollout checker, if the strategy is managed. Subsequent calls do nothing.
    pub fn start(&mut self, shutdown: broadcast::Receiver<()>) {
        if let Some(refresh) = self.refresh.take() {
            self.task = Some(tokio::spawn(refresh.run(shutdown)));
        }
    }

    /// Take the rollout checker to drive it directly instead of calling `start`.
    pub fn take_refresh_loop(&mut self) -> Option<RefreshLoop> {
        self.refresh.take()
    }

    /// Wait for the rollout checker to exit after shutdown was signalled.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Rollout checker task failed");
            }
        }
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn current_version(&self) -> ConfigVersion {
        self.current.load().as_ref().clone()
    }

    /// The snapshot currently served to this manager's node.
    pub fn current_snapshot(&self) -> Option<Arc<ResourceSnapshot>> {
        self.store.snapshot(&self.node_key)
    }

    pub fn store(&self) -> Arc<dyn SnapshotStore> {
        self.store.clone()
    }

    /// A cloneable read-only view for status reporting.
    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle {
            identity: self.identity.clone(),
            current: self.current.clone(),
            store: self.store.clone(),
            node_key: self.node_key.clone(),
        }
    }
}

/// Read-only view of the manager's state.
#[derive(Clone)]
pub struct StatusHandle {
    identity: ServiceIdentity,
    current: Arc<ArcSwap<ConfigVersion>>,
    store: Arc<dyn SnapshotStore>,
    node_key: ClientIdentityKey,
}

impl StatusHandle {
    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn current_version(&self) -> ConfigVersion {
        self.current.load().as_ref().clone()
    }

    pub fn snapshot_version(&self) -> Option<String> {
        self.store.snapshot(&self.node_key).map(|s| s.version.clone())
    }
}
