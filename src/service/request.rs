//! Shared request plumbing for the remote clients.

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::service::types::{FetchError, FetchResult};

/// Issue a GET and return the response body, enforcing `deadline` on the whole exchange.
pub async fn get_text(
    client: &reqwest::Client,
    url: &Url,
    headers: HeaderMap,
    deadline: Duration,
) -> FetchResult<String> {
    let exchange = async {
        let response = client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })
    };

    match timeout(deadline, exchange).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            secs: deadline.as_secs(),
        }),
    }
}

/// Issue a GET and decode the JSON body.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    headers: HeaderMap,
    deadline: Duration,
) -> FetchResult<T> {
    let body = get_text(client, url, headers, deadline).await?;
    serde_json::from_str(&body).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Join `path` onto `base`, treating `base` as a directory.
pub fn join_url(base: &Url, path: &str) -> FetchResult<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| FetchError::Request {
            url: format!("{}{}", base, path),
            message: e.to_string(),
        })
}

/// Append `segments` to the path of `base`, percent-encoding each one.
pub fn append_segments(base: &Url, segments: &[&str]) -> FetchResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| FetchError::Request {
            url: base.to_string(),
            message: "URL cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        let base = Url::parse("http://127.0.0.1:9000").unwrap();
        let joined = join_url(&base, "/v1/services/a").unwrap();
        assert_eq!(joined.as_str(), "http://127.0.0.1:9000/v1/services/a");

        let base = Url::parse("http://metadata/prefix").unwrap();
        let joined = join_url(&base, "computeMetadata/v1/project/project-id").unwrap();
        assert_eq!(
            joined.as_str(),
            "http://metadata/prefix/computeMetadata/v1/project/project-id"
        );
    }

    #[test]
    fn test_append_segments() {
        let base = Url::parse("http://127.0.0.1:9000").unwrap();
        let url = append_segments(&base, &["v1", "services", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/v1/services/a%20b%2Fc");

        let base = Url::parse("mailto:ops@example.com").unwrap();
        assert!(append_segments(&base, &["v1"]).is_err());
    }
}
