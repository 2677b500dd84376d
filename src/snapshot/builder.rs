//! Resource generation from a resolved service.
//!
//! # Responsibilities
//! - Turn a `ResolvedServiceInfo` into clusters, routes, listeners and endpoints
//! - Produce the four collections together or not at all
//! - Keep ordering deterministic so identical input yields identical snapshots

use std::net::SocketAddr;

use crate::service::info::ResolvedServiceInfo;
use crate::snapshot::types::{
    BuildError, Cluster, Listener, ResourceSnapshot, RouteConfiguration, RouteEntry,
};

/// Name of the single route configuration the ingress listener serves.
pub const LOCAL_ROUTE_NAME: &str = "local_route";

/// Name of the ingress listener.
pub const INGRESS_LISTENER_NAME: &str = "ingress_listener";

/// Converts a resolved service into a resource snapshot.
pub trait SnapshotBuilder: Send + Sync {
    fn build(&self, info: &ResolvedServiceInfo) -> Result<ResourceSnapshot, BuildError>;
}

/// Generates a local backend cluster, one cluster per remote backend,
/// a single route configuration and a single ingress listener.
#[derive(Debug, Default, Clone)]
pub struct DefaultSnapshotBuilder;

impl DefaultSnapshotBuilder {
    pub fn new() -> Self {
        Self
    }

    fn make_clusters(&self, info: &ResolvedServiceInfo) -> Result<Vec<Cluster>, BuildError> {
        let options = &info.options;
        let (host, port) = split_host_port(&options.backend_address).ok_or_else(|| {
            BuildError::InvalidOption {
                field: "backend_address",
                reason: format!("'{}' is not host:port", options.backend_address),
            }
        })?;

        let mut clusters = vec![Cluster {
            name: info.local_cluster_name(),
            host,
            port,
            tls: false,
            connect_timeout_ms: options.cluster_connect_timeout_ms,
        }];
        clusters.extend(info.backends.iter().map(|backend| Cluster {
            name: backend.cluster_name.clone(),
            host: backend.host.clone(),
            port: backend.port,
            tls: backend.tls,
            connect_timeout_ms: options.cluster_connect_timeout_ms,
        }));
        clusters.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clusters)
    }

    fn make_routes(&self, info: &ResolvedServiceInfo) -> Vec<RouteConfiguration> {
        let local = info.local_cluster_name();
        let entries = info
            .operations
            .iter()
            .map(|op| RouteEntry {
                selector: op.selector.clone(),
                method: op.method.to_string(),
                path: op.path.clone(),
                cluster: op.backend_cluster.clone().unwrap_or_else(|| local.clone()),
            })
            .collect();

        vec![RouteConfiguration {
            name: LOCAL_ROUTE_NAME.to_string(),
            entries,
        }]
    }

    fn make_listener(&self, info: &ResolvedServiceInfo) -> Result<Listener, BuildError> {
        let options = &info.options;
        if options.listener_port == 0 {
            return Err(BuildError::InvalidOption {
                field: "listener_port",
                reason: "must be a non-zero port".to_string(),
            });
        }

        Ok(Listener {
            name: INGRESS_LISTENER_NAME.to_string(),
            address: options.listener_address.clone(),
            port: options.listener_port,
            route_config_name: LOCAL_ROUTE_NAME.to_string(),
        })
    }
}

impl SnapshotBuilder for DefaultSnapshotBuilder {
    fn build(&self, info: &ResolvedServiceInfo) -> Result<ResourceSnapshot, BuildError> {
        tracing::info!(service = %info.name, apis = ?info.api_names, "Making configuration");

        let clusters = self.make_clusters(info)?;
        let routes = self.make_routes(info);

        tracing::debug!(service = %info.name, "Adding listener configuration");
        let listener = self.make_listener(info)?;

        Ok(ResourceSnapshot {
            version: info.config_id.clone(),
            endpoints: Vec::new(),
            clusters,
            routes,
            listeners: vec![listener],
        })
    }
}

fn split_host_port(address: &str) -> Option<(String, u16)> {
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Some((addr.ip().to_string(), addr.port()));
    }
    let (host, port) = address.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port.parse().ok()?))
}
