//! Resource transport
//!
//! [`ResourceFetcher`] is the seam between the orchestrator and the network.
//! [`HttpFetcher`] is the reqwest implementation used by the binary; tests
//! substitute scripted fetchers.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("recplay-loader/", env!("CARGO_PKG_VERSION"));

/// Transport errors
///
/// Anything that prevents a response from being read. A response with an
/// error status is not a transport error.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Body read error: {0}")]
    Body(String),
}

/// Response to a GET
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// Final URL after redirects
    pub url: String,
    /// Body text; empty for non-success responses
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Response to a HEAD existence probe
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    /// Final URL after redirects, used to recover the probed tag
    pub url: String,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network access used by a load attempt
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// GET a resource; the body is read only for success statuses
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;

    /// HEAD a resource
    async fn head(&self, url: &str) -> Result<ProbeResponse, FetchError>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given transport timeout
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        tracing::trace!(url = %url, "GET");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        let final_url = response.url().to_string();

        let body = if status.is_success() {
            response
                .text()
                .await
                .map_err(|e| FetchError::Body(e.to_string()))?
        } else {
            String::new()
        };

        Ok(FetchResponse {
            status: status.as_u16(),
            url: final_url,
            body,
        })
    }

    async fn head(&self, url: &str) -> Result<ProbeResponse, FetchError> {
        tracing::trace!(url = %url, "HEAD");

        let response = self
            .http_client
            .head(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(ProbeResponse {
            status: response.status().as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// URL of a record resource: `{base_url}/{record_id}/{path}`
pub fn resource_url(base_url: &str, record_id: &str, path: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        record_id,
        path.trim_start_matches('/')
    )
}

/// Relative path probed for a media candidate
pub fn media_path(tag: &str) -> String {
    format!("video/webcams.{}", tag)
}
