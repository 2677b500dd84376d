//! Config manager subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap (config_manager.rs):
//!     identity.rs (service name, rollout strategy)
//!     → initial version (explicit/metadata for fixed, VersionTracker for managed)
//!     → updater.rs (fetch → resolve → build → commit)
//!     → ready
//!
//! Managed strategy (refresh.rs):
//!     tick → VersionTracker::resolve
//!     → version.rs change detection
//!     → updater.rs on change
//!     → stored version updated only after a successful commit
//! ```
//!
//! # Design Decisions
//! - Bootstrap errors abort startup; refresh errors are logged and absorbed
//! - Snapshot state is never patched, only replaced whole
//! - Collaborators are injected as trait objects so the core runs against fakes

pub mod config_manager;
pub mod error;
pub mod identity;
pub mod refresh;
pub mod updater;
pub mod version;

pub use config_manager::{Collaborators, ConfigManager, StatusHandle};
pub use error::{ManagerError, ManagerResult};
pub use identity::{RolloutStrategy, ServiceIdentity};
pub use refresh::{RefreshLoop, TickOutcome};
pub use version::{ConfigVersion, VersionTracker};
