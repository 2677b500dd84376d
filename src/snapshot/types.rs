//! Resource snapshot types and error definitions.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Identity a proxy declares when it connects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodeIdentity {
    pub id: String,
    pub cluster: String,
}

impl NodeIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cluster: String::new(),
        }
    }
}

/// Key selecting which snapshot a connection observes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClientIdentityKey(pub String);

impl From<&str> for ClientIdentityKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for ClientIdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An upstream cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub connect_timeout_ms: u64,
}

/// A resolved endpoint of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub cluster_name: String,
    pub host: String,
    pub port: u16,
}

/// One routing entry inside a route configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub selector: String,
    pub method: String,
    pub path: String,
    pub cluster: String,
}

/// A named route configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteConfiguration {
    pub name: String,
    pub entries: Vec<RouteEntry>,
}

/// An ingress listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listener {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub route_config_name: String,
}

/// A versioned bundle of resources served to a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSnapshot {
    pub version: String,
    pub endpoints: Vec<Endpoint>,
    pub clusters: Vec<Cluster>,
    pub routes: Vec<RouteConfiguration>,
    pub listeners: Vec<Listener>,
}

impl ResourceSnapshot {
    /// Check the snapshot references only resources it contains.
    pub fn check_consistent(&self) -> Result<(), CommitError> {
        if self.version.is_empty() {
            return Err(CommitError::Inconsistent(
                "snapshot version is empty".to_string(),
            ));
        }

        let route_names: BTreeSet<&str> = self.routes.iter().map(|r| r.name.as_str()).collect();
        for listener in &self.listeners {
            if !route_names.contains(listener.route_config_name.as_str()) {
                return Err(CommitError::Inconsistent(format!(
                    "listener {} references missing route configuration {}",
                    listener.name, listener.route_config_name
                )));
            }
        }

        let cluster_names: BTreeSet<&str> =
            self.clusters.iter().map(|c| c.name.as_str()).collect();
        let dangling = self
            .routes
            .iter()
            .flat_map(|r| r.entries.iter())
            .map(|e| e.cluster.as_str())
            .chain(self.endpoints.iter().map(|e| e.cluster_name.as_str()))
            .find(|name| !cluster_names.contains(name));
        if let Some(name) = dangling {
            return Err(CommitError::Inconsistent(format!(
                "snapshot references missing cluster {}",
                name
            )));
        }

        Ok(())
    }
}

/// A configuration document that cannot be turned into resources.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("service config is missing a name")]
    MissingName,

    #[error("service config name {found} does not match service {expected}")]
    NameMismatch { expected: String, found: String },

    #[error("service config {0} declares no APIs")]
    NoApis(String),

    #[error("invalid backend address {address} for {selector}: {reason}")]
    InvalidBackend {
        selector: String,
        address: String,
        reason: String,
    },

    #[error("invalid generator option {field}: {reason}")]
    InvalidOption { field: &'static str, reason: String },
}

/// The snapshot store refused a snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),

    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ResourceSnapshot {
        ResourceSnapshot {
            version: "c1".to_string(),
            endpoints: Vec::new(),
            clusters: vec![Cluster {
                name: "svc_local".to_string(),
                host: "127.0.0.1".to_string(),
                port: 8082,
                tls: false,
                connect_timeout_ms: 1000,
            }],
            routes: vec![RouteConfiguration {
                name: "local_route".to_string(),
                entries: vec![RouteEntry {
                    selector: "a.B".to_string(),
                    method: "GET".to_string(),
                    path: "/b".to_string(),
                    cluster: "svc_local".to_string(),
                }],
            }],
            listeners: vec![Listener {
                name: "ingress_listener".to_string(),
                address: "0.0.0.0".to_string(),
                port: 8080,
                route_config_name: "local_route".to_string(),
            }],
        }
    }

    #[test]
    fn test_consistent_snapshot() {
        assert!(snapshot().check_consistent().is_ok());
    }

    #[test]
    fn test_empty_version_rejected() {
        let mut s = snapshot();
        s.version.clear();
        assert!(s.check_consistent().is_err());
    }

    #[test]
    fn test_dangling_references_rejected() {
        let mut s = snapshot();
        s.listeners[0].route_config_name = "missing".to_string();
        let err = s.check_consistent().unwrap_err();
        assert!(err.to_string().contains("missing route configuration"));

        let mut s = snapshot();
        s.routes[0].entries[0].cluster = "gone".to_string();
        let err = s.check_consistent().unwrap_err();
        assert!(err.to_string().contains("gone"));
    }
}
