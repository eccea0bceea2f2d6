//! HTTP transport seam. A single GET with a timeout budget, full body read.

use crate::error::FetchError;
use crate::utils::log_timed_request;
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues one GET and returns the whole body.
    async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// reqwest-backed transport sharing one connection pool across requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, connect_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| FetchError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| FetchError::Network(format!("Invalid URL '{}': {}", url, e)))?;

        debug!("Download URL: {}", url);
        let label = format!("GET {}", url);
        let response = log_timed_request(&label, self.client.get(parsed).timeout(timeout).send())
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("HTTP error {} from {}", status, url);
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_a_network_error() {
        let transport = HttpTransport::new("netcache-test", Duration::from_secs(1)).unwrap();
        let err = transport
            .get("not a url", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
