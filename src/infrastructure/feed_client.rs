use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, HeaderValue};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[async_trait]
pub trait EventFeedClient: Send + Sync {
    /// Raw feed body.
    async fn fetch_feed(&self) -> Result<String, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestEventFeedClient {
    client: Client,
    url: Url,
}

impl ReqwestEventFeedClient {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| InfraError::Feed(format!("failed to build http client: {error}")))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl EventFeedClient for ReqwestEventFeedClient {
    async fn fetch_feed(&self) -> Result<String, InfraError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .send()
            .await
            .map_err(|error| {
                InfraError::Feed(format!("network error while fetching {}: {error}", self.url))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Feed(format!("failed reading feed response from {}: {error}", self.url))
        })?;

        if !status.is_success() {
            return Err(InfraError::FeedStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Reads the feed from a local static file.
#[derive(Debug, Clone)]
pub struct FileEventFeedClient {
    path: PathBuf,
}

impl FileEventFeedClient {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl EventFeedClient for FileEventFeedClient {
    async fn fetch_feed(&self) -> Result<String, InfraError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}
