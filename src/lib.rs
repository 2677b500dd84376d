//! Proxy config manager library.
//!
//! Tracks the active configuration version of a managed service, turns the
//! configuration into the resource snapshot a data-plane proxy consumes, and
//! republishes that snapshot whenever a new rollout becomes active.

pub mod admin;
pub mod config;
pub mod lifecycle;
pub mod manager;
pub mod observability;
pub mod service;
pub mod snapshot;

pub use config::AppConfig;
pub use lifecycle::Shutdown;
pub use manager::{Collaborators, ConfigManager, ManagerError};
