//! Resolved view of a service configuration.
//!
//! A `ResolvedServiceInfo` is derived from one immutable document and is never
//! patched: every version change builds a new one from scratch.

use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

use crate::config::GeneratorOptions;
use crate::service::types::{DeploymentAttributes, ServiceConfigDocument};
use crate::snapshot::types::BuildError;

/// A remote backend a selector is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub cluster_name: String,
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

/// An HTTP operation exposed by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOperation {
    pub selector: String,
    pub method: &'static str,
    pub path: String,
    /// Cluster serving this operation; `None` means the local backend.
    pub backend_cluster: Option<String>,
}

/// Everything the snapshot builder needs, validated.
#[derive(Debug, Clone)]
pub struct ResolvedServiceInfo {
    pub name: String,
    pub config_id: String,
    pub api_names: Vec<String>,
    /// Distinct remote backends, sorted by cluster name.
    pub backends: Vec<BackendTarget>,
    /// HTTP operations, sorted by selector.
    pub operations: Vec<HttpOperation>,
    pub options: GeneratorOptions,
    pub attributes: Option<DeploymentAttributes>,
    pub document: Arc<ServiceConfigDocument>,
}

impl ResolvedServiceInfo {
    /// Resolve a fetched document for `service_name` at `config_id`.
    pub fn new(
        service_name: &str,
        config_id: &str,
        document: ServiceConfigDocument,
        options: GeneratorOptions,
    ) -> Result<Self, BuildError> {
        if document.name.is_empty() {
            return Err(BuildError::MissingName);
        }
        if document.name != service_name {
            return Err(BuildError::NameMismatch {
                expected: service_name.to_string(),
                found: document.name.clone(),
            });
        }
        if document.apis.is_empty() {
            return Err(BuildError::NoApis(document.name.clone()));
        }

        let mut targets: BTreeMap<String, BackendTarget> = BTreeMap::new();
        let mut selector_backends: BTreeMap<&str, String> = BTreeMap::new();
        if let Some(backend) = &document.backend {
            for rule in &backend.rules {
                if rule.address.is_empty() {
                    continue;
                }
                let target = parse_backend(&rule.selector, &rule.address)?;
                selector_backends.insert(&rule.selector, target.cluster_name.clone());
                targets.entry(target.cluster_name.clone()).or_insert(target);
            }
        }

        let mut operations: Vec<HttpOperation> = document
            .http
            .iter()
            .flat_map(|http| http.rules.iter())
            .filter_map(|rule| {
                rule.pattern().map(|(method, path)| HttpOperation {
                    selector: rule.selector.clone(),
                    method,
                    path: path.to_string(),
                    backend_cluster: selector_backends.get(rule.selector.as_str()).cloned(),
                })
            })
            .collect();
        operations.sort_by(|a, b| a.selector.cmp(&b.selector).then(a.method.cmp(&b.method)));

        Ok(Self {
            name: document.name.clone(),
            config_id: config_id.to_string(),
            api_names: document.apis.iter().map(|a| a.name.clone()).collect(),
            backends: targets.into_values().collect(),
            operations,
            options,
            attributes: None,
            document: Arc::new(document),
        })
    }

    /// Attach deployment attributes reported by the metadata server.
    pub fn with_attributes(mut self, attributes: DeploymentAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Name of the cluster serving the local backend.
    pub fn local_cluster_name(&self) -> String {
        format!("{}_local", self.name)
    }
}

fn parse_backend(selector: &str, address: &str) -> Result<BackendTarget, BuildError> {
    let invalid = |reason: String| BuildError::InvalidBackend {
        selector: selector.to_string(),
        address: address.to_string(),
        reason,
    };

    let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    let tls = match url.scheme() {
        "https" | "grpcs" => true,
        "http" | "grpc" => false,
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    };
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("missing host".to_string()))?
        .to_string();
    let port = url
        .port()
        .unwrap_or(if tls { 443 } else { 80 });

    Ok(BackendTarget {
        cluster_name: format!("backend_{}:{}", host, port),
        host,
        port,
        tls,
    })
}
