//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CLI flags override file values (main.rs)
//!     → AppConfig (validated, immutable)
//!     → ManagerConfig handed once to bootstrap
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no process-wide flag state
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AppConfig;
pub use schema::ChangeDetection;
pub use schema::GeneratorOptions;
pub use schema::ManagerConfig;
pub use schema::MetadataConfig;
pub use schema::ServiceManagementConfig;
