//! Metadata server client.
//!
//! # Responsibilities
//! - Read the service name, config id and rollout strategy attributes
//! - Report deployment attributes (project, zone, platform)
//! - Mint access tokens for the service management API
//!
//! # Design Decisions
//! - Absent entirely on deployments without a metadata server
//! - Every call is bounded by the configured timeout
//! - Deployment attributes are best-effort: missing values are `None`

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::MetadataConfig;
use crate::service::request::{get_json, get_text, join_url};
use crate::service::types::{DeploymentAttributes, FetchError, FetchResult};

const SERVICE_NAME_ATTR: &str = "instance/attributes/endpoints-service-name";
const CONFIG_ID_ATTR: &str = "instance/attributes/endpoints-service-config-id";
const ROLLOUT_STRATEGY_ATTR: &str = "instance/attributes/endpoints-rollout-strategy";
const CLUSTER_NAME_ATTR: &str = "instance/attributes/cluster-name";
const PROJECT_ID_PATH: &str = "project/project-id";
const ZONE_PATH: &str = "instance/zone";
const TOKEN_PATH: &str = "instance/service-accounts/default/token";

/// Tokens are refreshed this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Capability set of a metadata server.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_service_name(&self) -> FetchResult<String>;

    async fn fetch_config_id(&self) -> FetchResult<String>;

    async fn fetch_rollout_strategy(&self) -> FetchResult<String>;

    async fn fetch_deployment_attributes(&self) -> DeploymentAttributes;

    /// Bearer token for calls to the service management API.
    async fn fetch_access_token(&self) -> FetchResult<String> {
        Err(FetchError::Missing(
            "metadata source does not provide access tokens".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// HTTP client for a GCE-style metadata server.
pub struct MetadataClient {
    client: reqwest::Client,
    base: Url,
    timeout_duration: Duration,
    token: Mutex<Option<(String, Instant)>>,
}

impl MetadataClient {
    /// Create a metadata client, or `None` when the deployment has no metadata server.
    pub fn new(config: &MetadataConfig) -> FetchResult<Option<Self>> {
        if config.non_gcp {
            return Ok(None);
        }

        let base = Url::parse(&config.url).map_err(|e| FetchError::Request {
            url: config.url.clone(),
            message: e.to_string(),
        })?;

        // The metadata server is link-local; never route it through a proxy.
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| FetchError::Request {
                url: config.url.clone(),
                message: e.to_string(),
            })?;

        Ok(Some(Self {
            client,
            base,
            timeout_duration: Duration::from_secs(config.timeout_secs),
            token: Mutex::new(None),
        }))
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Metadata-Flavor", HeaderValue::from_static("Google"));
        headers
    }

    fn url(&self, path: &str) -> FetchResult<Url> {
        join_url(&self.base, &format!("computeMetadata/v1/{}", path))
    }

    async fn get_value(&self, path: &str) -> FetchResult<String> {
        let url = self.url(path)?;
        let value = get_text(&self.client, &url, Self::headers(), self.timeout_duration).await?;
        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(FetchError::Missing(format!(
                "metadata key {} is empty",
                path
            )));
        }
        Ok(value)
    }

    fn cached_token(&self) -> Option<String> {
        let guard = self.token.lock().ok()?;
        match guard.as_ref() {
            Some((token, expires_at)) if Instant::now() + TOKEN_EXPIRY_MARGIN < *expires_at => {
                Some(token.clone())
            }
            _ => None,
        }
    }
}

#[async_trait]
impl MetadataSource for MetadataClient {
    async fn fetch_service_name(&self) -> FetchResult<String> {
        self.get_value(SERVICE_NAME_ATTR).await
    }

    async fn fetch_config_id(&self) -> FetchResult<String> {
        self.get_value(CONFIG_ID_ATTR).await
    }

    async fn fetch_rollout_strategy(&self) -> FetchResult<String> {
        self.get_value(ROLLOUT_STRATEGY_ATTR).await
    }

    async fn fetch_deployment_attributes(&self) -> DeploymentAttributes {
        let project_id = self.get_value(PROJECT_ID_PATH).await.ok();
        // Zone comes back as "projects/<number>/zones/<zone>".
        let zone = self
            .get_value(ZONE_PATH)
            .await
            .ok()
            .and_then(|z| z.rsplit('/').next().map(str::to_string));
        let platform = match self.get_value(CLUSTER_NAME_ATTR).await {
            Ok(_) => Some("GKE".to_string()),
            Err(_) if project_id.is_some() => Some("GCE".to_string()),
            Err(_) => None,
        };

        DeploymentAttributes {
            project_id,
            zone,
            platform,
        }
    }

    async fn fetch_access_token(&self) -> FetchResult<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let url = self.url(TOKEN_PATH)?;
        let response: TokenResponse =
            get_json(&self.client, &url, Self::headers(), self.timeout_duration).await?;
        // An expiry too far out to represent is used once and not cached.
        let expires_at = Instant::now().checked_add(Duration::from_secs(response.expires_in));

        if let (Some(expires_at), Ok(mut guard)) = (expires_at, self.token.lock()) {
            *guard = Some((response.access_token.clone(), expires_at));
        }
        tracing::debug!(expires_in = response.expires_in, "Fetched access token from metadata server");
        Ok(response.access_token)
    }
}

impl std::fmt::Debug for MetadataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataClient")
            .field("base", &self.base.as_str())
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
