//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Bootstrap config manager → Start rollout checker → Admin
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Rollout checker exits at next tick boundary → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any bootstrap error is fatal
//! - Admin endpoint starts last (status only once a snapshot exists)

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
