//! Versioned per-client snapshot store.
//!
//! # Responsibilities
//! - Hold the current snapshot for each client identity key
//! - Swap in a new snapshot atomically while readers are in flight
//! - Map a connecting node's identity to its key
//!
//! # Design Decisions
//! - One `ArcSwap` slot per key: readers load an `Arc` and never observe a mix
//! - Snapshots are checked for consistency before they become visible
//! - Identity mapping and logging are injected by the owner of the store

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::Arc;

use crate::snapshot::types::{ClientIdentityKey, CommitError, NodeIdentity, ResourceSnapshot};

/// Sink for the store's informational and error events.
pub trait LogSink: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Maps a node's declared identity to the key its snapshot is stored under.
pub trait NodeHash: Send + Sync {
    fn key(&self, node: &NodeIdentity) -> ClientIdentityKey;
}

/// Keys nodes by their declared node id.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeIdHash;

impl NodeHash for NodeIdHash {
    fn key(&self, node: &NodeIdentity) -> ClientIdentityKey {
        ClientIdentityKey(node.id.clone())
    }
}

/// The capabilities the config manager needs from a snapshot store.
pub trait SnapshotStore: Send + Sync {
    /// Atomically replace the snapshot visible under `key`.
    fn commit(&self, key: &ClientIdentityKey, snapshot: ResourceSnapshot) -> Result<(), CommitError>;

    /// Current snapshot for `key`.
    fn snapshot(&self, key: &ClientIdentityKey) -> Option<Arc<ResourceSnapshot>>;

    /// Key a node's snapshot is stored under.
    fn key_for(&self, node: &NodeIdentity) -> ClientIdentityKey;

    /// Current snapshot for a connecting node.
    fn fetch(&self, node: &NodeIdentity) -> Option<Arc<ResourceSnapshot>>;
}

/// In-memory snapshot store shared by every connection.
pub struct InMemorySnapshotStore {
    snapshots: DashMap<ClientIdentityKey, ArcSwap<ResourceSnapshot>>,
    hasher: Arc<dyn NodeHash>,
    log: Arc<dyn LogSink>,
}

impl InMemorySnapshotStore {
    pub fn new(hasher: Arc<dyn NodeHash>, log: Arc<dyn LogSink>) -> Self {
        Self {
            snapshots: DashMap::new(),
            hasher,
            log,
        }
    }

    /// Number of keys holding a snapshot.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn commit(&self, key: &ClientIdentityKey, snapshot: ResourceSnapshot) -> Result<(), CommitError> {
        if let Err(e) = snapshot.check_consistent() {
            self.log.error(&format!("rejecting snapshot for node {}: {}", key, e));
            return Err(e);
        }

        let version = snapshot.version.clone();
        let snapshot = Arc::new(snapshot);
        self.snapshots
            .entry(key.clone())
            .and_modify(|slot| slot.store(Arc::clone(&snapshot)))
            .or_insert_with(|| ArcSwap::new(Arc::clone(&snapshot)));

        self.log.info(&format!(
            "committed snapshot version {} for node {}",
            version, key
        ));
        Ok(())
    }

    fn snapshot(&self, key: &ClientIdentityKey) -> Option<Arc<ResourceSnapshot>> {
        self.snapshots.get(key).map(|slot| slot.load_full())
    }

    fn key_for(&self, node: &NodeIdentity) -> ClientIdentityKey {
        self.hasher.key(node)
    }

    fn fetch(&self, node: &NodeIdentity) -> Option<Arc<ResourceSnapshot>> {
        let key = self.key_for(node);
        let snapshot = self.snapshot(&key);
        if snapshot.is_none() {
            self.log.info(&format!("no snapshot for node {}", key));
        }
        snapshot
    }
}

impl std::fmt::Debug for InMemorySnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySnapshotStore")
            .field("keys", &self.snapshots.len())
            .finish()
    }
}
