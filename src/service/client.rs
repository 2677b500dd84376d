//! Service management API client.
//!
//! # Responsibilities
//! - Fetch a service configuration document by config id
//! - List successful rollouts and pick the active config id
//! - Attach a bearer token when a token source is available

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::ServiceManagementConfig;
use crate::manager::version::{ConfigVersion, VersionTracker};
use crate::service::metadata::MetadataSource;
use crate::service::request::{append_segments, get_json};
use crate::service::types::{
    FetchError, FetchResult, ListRolloutsResponse, Rollout, ServiceConfigDocument,
};
use crate::service::ConfigFetcher;

/// HTTP client for the service management API.
#[derive(Clone)]
pub struct ServiceManagementClient {
    client: reqwest::Client,
    base: Url,
    timeout_duration: Duration,
    token_source: Option<Arc<dyn MetadataSource>>,
}

impl ServiceManagementClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `config` - Service management configuration
    /// * `token_source` - Where bearer tokens come from; requests are unauthenticated without one
    pub fn new(
        config: &ServiceManagementConfig,
        token_source: Option<Arc<dyn MetadataSource>>,
    ) -> FetchResult<Self> {
        let base = Url::parse(&config.url).map_err(|e| FetchError::Request {
            url: config.url.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            base,
            timeout_duration: Duration::from_secs(config.timeout_secs),
            token_source,
        })
    }

    async fn headers(&self) -> FetchResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(source) = &self.token_source {
            let token = source.fetch_access_token().await?;
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| FetchError::Missing(format!("unusable access token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn configs_url(&self, service: &str, config_id: &str) -> FetchResult<Url> {
        let mut url = append_segments(
            &self.base,
            &["v1", "services", service, "configs", config_id],
        )?;
        url.query_pairs_mut().append_pair("view", "FULL");
        Ok(url)
    }

    fn rollouts_url(&self, service: &str) -> FetchResult<Url> {
        let mut url = append_segments(&self.base, &["v1", "services", service, "rollouts"])?;
        url.query_pairs_mut().append_pair("filter", "status=SUCCESS");
        Ok(url)
    }
}

#[async_trait]
impl ConfigFetcher for ServiceManagementClient {
    async fn fetch(&self, service: &str, config_id: &str) -> FetchResult<ServiceConfigDocument> {
        let url = self.configs_url(service, config_id)?;
        let headers = self.headers().await?;
        tracing::debug!(url = %url, "Fetching service config");
        get_json(&self.client, &url, headers, self.timeout_duration).await
    }
}

#[async_trait]
impl VersionTracker for ServiceManagementClient {
    async fn resolve(
        &self,
        service: &str,
        previous_rollout_id: &str,
        previous_config_id: &str,
    ) -> FetchResult<ConfigVersion> {
        let url = self.rollouts_url(service)?;
        let headers = self.headers().await?;
        let response: ListRolloutsResponse =
            get_json(&self.client, &url, headers, self.timeout_duration).await?;

        let latest = response.rollouts.first().ok_or_else(|| {
            FetchError::Missing(format!("no successful rollouts found for service {}", service))
        })?;

        if latest.rollout_id == previous_rollout_id {
            return Ok(ConfigVersion::new(previous_rollout_id, previous_config_id));
        }

        let config_id = select_config_id(latest)?;
        Ok(ConfigVersion::new(latest.rollout_id.clone(), config_id))
    }
}

/// The config id receiving the largest share of traffic in a rollout.
///
/// Ties resolve to the lexicographically greatest config id.
pub fn select_config_id(rollout: &Rollout) -> FetchResult<String> {
    rollout
        .traffic_percent_strategy
        .as_ref()
        .and_then(|strategy| {
            strategy
                .percentages
                .iter()
                .max_by(|(a_id, a_pct), (b_id, b_pct)| {
                    a_pct.total_cmp(b_pct).then_with(|| a_id.cmp(b_id))
                })
                .map(|(id, _)| id.clone())
        })
        .ok_or_else(|| {
            FetchError::Missing(format!(
                "rollout {} has no traffic percentages",
                rollout.rollout_id
            ))
        })
}

impl std::fmt::Debug for ServiceManagementClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceManagementClient")
            .field("base", &self.base.as_str())
            .field("timeout", &self.timeout_duration)
            .field("authenticated", &self.token_source.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::types::TrafficPercentStrategy;
    use std::collections::BTreeMap;

    fn rollout(id: &str, percentages: &[(&str, f64)]) -> Rollout {
        Rollout {
            rollout_id: id.to_string(),
            status: "SUCCESS".to_string(),
            traffic_percent_strategy: Some(TrafficPercentStrategy {
                percentages: percentages
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect::<BTreeMap<_, _>>(),
            }),
        }
    }

    #[test]
    fn test_select_single_config() {
        let r = rollout("r1", &[("c1", 100.0)]);
        assert_eq!(select_config_id(&r).unwrap(), "c1");
    }

    #[test]
    fn test_select_majority_config() {
        let r = rollout("r2", &[("c1", 20.0), ("c2", 80.0)]);
        assert_eq!(select_config_id(&r).unwrap(), "c2");
    }

    #[test]
    fn test_select_tie_is_deterministic() {
        let r = rollout("r3", &[("c2", 50.0), ("c1", 50.0)]);
        assert_eq!(select_config_id(&r).unwrap(), "c2");
    }

    #[test]
    fn test_select_without_percentages() {
        let r = Rollout {
            rollout_id: "r4".to_string(),
            ..Default::default()
        };
        let err = select_config_id(&r).unwrap_err();
        assert!(err.to_string().contains("r4"));
    }

    #[test]
    fn test_urls() {
        let client = ServiceManagementClient::new(
            &ServiceManagementConfig {
                url: "http://127.0.0.1:9000".to_string(),
                timeout_secs: 1,
            },
            None,
        )
        .unwrap();
        assert_eq!(
            client.configs_url("bookstore.example", "2019-01-01r0").unwrap().as_str(),
            "http://127.0.0.1:9000/v1/services/bookstore.example/configs/2019-01-01r0?view=FULL"
        );
        assert_eq!(
            client.rollouts_url("bookstore.example").unwrap().as_str(),
            "http://127.0.0.1:9000/v1/services/bookstore.example/rollouts?filter=status%3DSUCCESS"
        );
    }

    #[test]
    fn test_url_segments_are_escaped() {
        let client = ServiceManagementClient::new(
            &ServiceManagementConfig {
                url: "http://127.0.0.1:9000/api/".to_string(),
                timeout_secs: 1,
            },
            None,
        )
        .unwrap();
        assert_eq!(
            client.configs_url("svc", "a/b?c#d").unwrap().as_str(),
            "http://127.0.0.1:9000/api/v1/services/svc/configs/a%2Fb%3Fc%23d?view=FULL"
        );
        assert_eq!(
            client.rollouts_url("../other").unwrap().path(),
            "/api/v1/services/..%2Fother/rollouts"
        );
    }
}
