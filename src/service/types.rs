//! Service configuration document, rollout wire types and fetch errors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while talking to a remote configuration source.
///
/// A `FetchError` only ever describes availability of the remote call. A document
/// that was retrieved but cannot be turned into resources is a `BuildError`.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection or transport failure.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Remote answered with a non-success status.
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Response body could not be decoded.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Request did not complete in time.
    #[error("request to {url} timed out after {secs} seconds")]
    Timeout { url: String, secs: u64 },

    /// Remote answered but the requested value is absent.
    #[error("{0}")]
    Missing(String),
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// A service configuration document, as served by the service management API.
///
/// Only the parts the resource generator reads are modelled; everything else is
/// carried along untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfigDocument {
    pub name: String,
    pub id: String,
    pub title: String,
    pub apis: Vec<Api>,
    pub http: Option<Http>,
    pub backend: Option<Backend>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Api {
    pub name: String,
    pub version: String,
    pub methods: Vec<ApiMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiMethod {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Http {
    pub rules: Vec<HttpRule>,
}

/// Maps an RPC selector to an HTTP verb and path template.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpRule {
    pub selector: String,
    pub get: Option<String>,
    pub put: Option<String>,
    pub post: Option<String>,
    pub delete: Option<String>,
    pub patch: Option<String>,
}

impl HttpRule {
    /// The HTTP method and path template of this rule, if it declares one.
    pub fn pattern(&self) -> Option<(&'static str, &str)> {
        [
            ("GET", &self.get),
            ("PUT", &self.put),
            ("POST", &self.post),
            ("DELETE", &self.delete),
            ("PATCH", &self.patch),
        ]
        .into_iter()
        .find_map(|(method, path)| path.as_deref().map(|p| (method, p)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Backend {
    pub rules: Vec<BackendRule>,
}

/// Routes a selector to a remote backend address.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendRule {
    pub selector: String,
    pub address: String,
    pub deadline: Option<f64>,
}

/// Deployment attributes reported by the metadata server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentAttributes {
    pub project_id: Option<String>,
    pub zone: Option<String>,
    pub platform: Option<String>,
}

/// Response of the list rollouts call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListRolloutsResponse {
    pub rollouts: Vec<Rollout>,
}

/// A single rollout of a service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rollout {
    pub rollout_id: String,
    pub status: String,
    pub traffic_percent_strategy: Option<TrafficPercentStrategy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrafficPercentStrategy {
    /// Config id → percentage of traffic.
    pub percentages: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_keeps_unknown_fields() {
        let doc: ServiceConfigDocument = serde_json::from_str(
            r#"{
                "name": "bookstore.example",
                "id": "2019-01-01r0",
                "apis": [{"name": "endpoints.examples.bookstore.Bookstore"}],
                "http": {"rules": [{"selector": "b.ListShelves", "get": "/v1/shelves"}]},
                "control": {"environment": "servicecontrol.googleapis.com"}
            }"#,
        )
        .unwrap();
        assert_eq!(doc.name, "bookstore.example");
        assert_eq!(doc.apis.len(), 1);
        assert!(doc.extra.contains_key("control"));
        assert!(doc.backend.is_none());
    }

    #[test]
    fn test_http_rule_pattern() {
        let rule = HttpRule {
            selector: "b.CreateShelf".to_string(),
            post: Some("/v1/shelves".to_string()),
            ..Default::default()
        };
        assert_eq!(rule.pattern(), Some(("POST", "/v1/shelves")));
        assert_eq!(HttpRule::default().pattern(), None);
    }

    #[test]
    fn test_error_display() {
        let err = FetchError::Status {
            url: "http://sm/v1/services/x".to_string(),
            status: 403,
        };
        assert_eq!(
            err.to_string(),
            "request to http://sm/v1/services/x returned status 403"
        );
    }
}
