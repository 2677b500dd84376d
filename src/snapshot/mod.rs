//! Snapshot subsystem.
//!
//! # Data Flow
//! ```text
//! ResolvedServiceInfo
//!     → builder.rs (clusters, routes, listeners, endpoints)
//!     → ResourceSnapshot (version = config id)
//!     → store.rs commit (consistency check, atomic swap per client key)
//!
//! Connected proxy:
//!     NodeIdentity → NodeHash → ClientIdentityKey → current snapshot
//! ```
//!
//! # Design Decisions
//! - Snapshots are built whole and committed whole; there is no partial update
//! - The previous snapshot stays visible until a replacement is committed
//! - Serving the discovery protocol is left to the consumer of the store

pub mod builder;
pub mod store;
pub mod types;

pub use builder::{DefaultSnapshotBuilder, SnapshotBuilder};
pub use store::{InMemorySnapshotStore, LogSink, NodeHash, NodeIdHash, SnapshotStore};
pub use types::{BuildError, ClientIdentityKey, CommitError, NodeIdentity, ResourceSnapshot};
