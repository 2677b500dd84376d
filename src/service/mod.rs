//! Remote configuration sources.
//!
//! # Data Flow
//! ```text
//! metadata.rs (metadata server)
//!     → service name, config id, rollout strategy, deployment attributes
//!     → access tokens for client.rs
//!
//! client.rs (service management API)
//!     → rollouts → active (rollout id, config id)
//!     → configs/{id} → ServiceConfigDocument
//!
//! info.rs
//!     → ServiceConfigDocument + config id + generator options
//!     → ResolvedServiceInfo (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Every remote call has a deadline owned by the client, never by the manager
//! - No retries inside a call; the next rollout check is the retry
//! - Fetch failures and invalid documents are separate error types

use async_trait::async_trait;

pub mod client;
pub mod info;
pub mod metadata;
pub mod request;
pub mod types;

pub use client::ServiceManagementClient;
pub use info::ResolvedServiceInfo;
pub use metadata::{MetadataClient, MetadataSource};
pub use types::{DeploymentAttributes, FetchError, FetchResult, ServiceConfigDocument};

/// Fetches immutable service configuration documents by config id.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    async fn fetch(&self, service: &str, config_id: &str) -> FetchResult<ServiceConfigDocument>;
}
