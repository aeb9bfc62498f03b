use crate::error::SdkError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use stakecache_types::{Network, StakingSnapshot};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Request timeout used by [`HttpSnapshotSource::new`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Where a [`crate::PullThroughCacheClient`] gets fresh snapshots from.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, network: Network) -> Result<StakingSnapshot, SdkError>;
}

/// Fetches snapshots from a stakecache server's `/staking` endpoint.
#[derive(Clone)]
pub struct HttpSnapshotSource {
    base_url: Url,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl HttpSnapshotSource {
    /// Create a source for the server at `base_url` (e.g. `http://localhost:8080/`).
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, SdkError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, SdkError> {
        Self::with_http_client(base_url, Client::builder().timeout(timeout).build()?)
    }

    /// Use an existing reqwest client (useful for custom TLS or middleware).
    pub fn with_http_client(base_url: impl AsRef<str>, http: Client) -> Result<Self, SdkError> {
        let mut url = Url::parse(base_url.as_ref())
            .map_err(|_| SdkError::InvalidBaseUrl(base_url.as_ref().to_string()))?;
        if !url.path().ends_with('/') {
            let mut path = url.path().trim_end_matches('/').to_owned();
            path.push('/');
            url.set_path(&path);
        }
        Ok(Self {
            base_url: url,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn snapshot_url(&self, network: Network) -> Result<Url, SdkError> {
        let mut url = self.base_url.join("staking")?;
        url.query_pairs_mut()
            .append_pair("network", &network.id().to_string());
        Ok(url)
    }

    async fn map_api_error(response: Response) -> SdkError {
        let status = response.status().as_u16();
        let bytes = response.bytes().await.unwrap_or_default();
        if let Ok(api_error) = serde_json::from_slice::<ErrorResponse>(&bytes) {
            return SdkError::server_error(status, api_error.error);
        }
        SdkError::server_error(status, String::from_utf8_lossy(&bytes))
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self, network: Network) -> Result<StakingSnapshot, SdkError> {
        let url = self.snapshot_url(network)?;
        debug!(%url, "fetching staking snapshot");
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Self::map_api_error(response).await);
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice::<StakingSnapshot>(&bytes)
            .map_err(|err| SdkError::Parse(err.to_string()))
    }
}
