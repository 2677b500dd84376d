//! The snapshot update protocol.
//!
//! # Flow
//! ```text
//! config id
//!     → ConfigFetcher::fetch        (FetchError)
//!     → ResolvedServiceInfo::new    (BuildError)
//!     → + deployment attributes
//!     → SnapshotBuilder::build      (BuildError)
//!     → SnapshotStore::commit       (CommitError)
//! ```
//!
//! Any failure returns before `commit`, so the store keeps the previous snapshot.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

use crate::config::GeneratorOptions;
use crate::manager::error::ManagerResult;
use crate::observability::metrics;
use crate::service::metadata::MetadataSource;
use crate::service::{ConfigFetcher, ResolvedServiceInfo};
use crate::snapshot::{ClientIdentityKey, NodeIdentity, SnapshotBuilder, SnapshotStore};

/// Fetches, builds and commits a snapshot for one config id.
#[derive(Clone)]
pub struct SnapshotUpdater {
    service_name: String,
    options: GeneratorOptions,
    node_key: ClientIdentityKey,
    fetcher: Arc<dyn ConfigFetcher>,
    builder: Arc<dyn SnapshotBuilder>,
    store: Arc<dyn SnapshotStore>,
    metadata: Option<Arc<dyn MetadataSource>>,
    /// Config id of the last committed snapshot.
    committed: Arc<ArcSwapOption<String>>,
}

impl SnapshotUpdater {
    pub fn new(
        service_name: String,
        options: GeneratorOptions,
        fetcher: Arc<dyn ConfigFetcher>,
        builder: Arc<dyn SnapshotBuilder>,
        store: Arc<dyn SnapshotStore>,
        metadata: Option<Arc<dyn MetadataSource>>,
    ) -> Self {
        let node_key = store.key_for(&NodeIdentity {
            id: options.node.clone(),
            cluster: options.node_cluster.clone(),
        });
        Self {
            service_name,
            options,
            node_key,
            fetcher,
            builder,
            store,
            metadata,
            committed: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// Key the snapshot is committed under, as mapped by the store's node hash.
    pub fn node_key(&self) -> &ClientIdentityKey {
        &self.node_key
    }

    /// Replace the committed snapshot with one generated for `config_id`.
    pub async fn update(&self, config_id: &str) -> ManagerResult<()> {
        let document = self
            .fetcher
            .fetch(&self.service_name, config_id)
            .await
            .inspect_err(|_| metrics::record_update_failure("fetch"))?;

        let mut info = ResolvedServiceInfo::new(
            &self.service_name,
            config_id,
            document,
            self.options.clone(),
        )
        .inspect_err(|_| metrics::record_update_failure("resolve"))?;

        if let Some(metadata) = &self.metadata {
            info = info.with_attributes(metadata.fetch_deployment_attributes().await);
        }

        let snapshot = self
            .builder
            .build(&info)
            .inspect_err(|_| metrics::record_update_failure("build"))?;

        self.store
            .commit(&self.node_key, snapshot)
            .inspect_err(|_| metrics::record_update_failure("commit"))?;

        let previous = self.committed.swap(Some(Arc::new(config_id.to_string())));
        metrics::record_snapshot_commit(
            &self.service_name,
            previous.as_deref().map(String::as_str),
            config_id,
        );
        tracing::info!(
            service = %self.service_name,
            config_id = %config_id,
            node = %self.node_key,
            "Proxy configuration is cached"
        );
        Ok(())
    }
}
