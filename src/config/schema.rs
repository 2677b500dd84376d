//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the config manager.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the config manager process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Service identity and rollout polling.
    pub manager: ManagerConfig,

    /// Service management API (configs and rollouts).
    pub service_management: ServiceManagementConfig,

    /// Metadata server settings.
    pub metadata: MetadataConfig,

    /// Resource generation options.
    pub generator: GeneratorOptions,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// How a resolved rollout is compared against the stored version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDetection {
    /// Update when the rollout id or the config id differs.
    #[default]
    Either,
    /// Update only when both the rollout id and the config id differ.
    Both,
}

/// Bootstrap inputs for the config manager.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Endpoint service name.
    pub service_name: Option<String>,

    /// Initial service config id (fixed strategy only).
    pub config_id: Option<String>,

    /// Rollout strategy, "fixed" or "managed".
    pub rollout_strategy: Option<String>,

    /// Fetch service name, config id and rollout strategy from the metadata server.
    pub check_metadata: bool,

    /// Interval between rollout checks in seconds.
    pub check_interval_secs: u64,

    /// Change detection policy for rollout checks.
    pub change_detection: ChangeDetection,
}

impl ManagerConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            service_name: None,
            config_id: None,
            rollout_strategy: None,
            check_metadata: false,
            check_interval_secs: 60,
            change_detection: ChangeDetection::Either,
        }
    }
}

/// Service management API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceManagementConfig {
    /// Base URL of the service management API.
    pub url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServiceManagementConfig {
    fn default() -> Self {
        Self {
            url: "https://servicemanagement.googleapis.com".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Metadata server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Base URL of the metadata server.
    pub url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Running outside of a managed platform: no metadata server is available.
    pub non_gcp: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            url: "http://169.254.169.254".to_string(),
            timeout_secs: 5,
            non_gcp: false,
        }
    }
}

/// Options that shape the generated proxy resources.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Node id the generated snapshot is committed under.
    pub node: String,

    /// Cluster the node declares; empty when unset.
    pub node_cluster: String,

    /// Address the ingress listener binds to.
    pub listener_address: String,

    /// Port the ingress listener binds to.
    pub listener_port: u16,

    /// Address of the local backend (e.g., "127.0.0.1:8082").
    pub backend_address: String,

    /// Cluster connect timeout in milliseconds.
    pub cluster_connect_timeout_ms: u64,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            node: "api_proxy".to_string(),
            node_cluster: String::new(),
            listener_address: "0.0.0.0".to_string(),
            listener_port: 8080,
            backend_address: "127.0.0.1:8082".to_string(),
            cluster_connect_timeout_ms: 20_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin status endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin endpoint.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin endpoint bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8001".to_string(),
        }
    }
}
