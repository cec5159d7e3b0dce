//! Cloud API client
//!
//! HTTP access to the player endpoints of the cloud:
//! - Lightweight config hash check
//! - Full config fetch
//! - Streaming asset download to disk
//!
//! Every request carries the device bearer token.

use std::io;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::config::CacheConfig;
use super::types::ConfigSnapshot;

#[derive(Debug, Deserialize)]
struct ConfigHashResponse {
    config_hash: String,
}

/// Client for the cloud player API
#[derive(Debug, Clone)]
pub struct CloudApi {
    client: Client,
    base_url: String,
    token: String,
    request_timeout: Duration,
    download_timeout: Duration,
}

impl CloudApi {
    /// Create a new API client from config
    pub fn new(config: &CacheConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(format!("AtlasPlayer/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            token: config.device_token.clone(),
            request_timeout: config.request_timeout,
            download_timeout: config.download_timeout,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an asset URL: absolute URLs pass through, anything else is
    /// appended to the server base URL.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.base_url, url)
        }
    }

    /// Fetch the server's current config hash for a player
    pub async fn fetch_config_hash(&self, player_id: &str) -> Result<String, FetchError> {
        let url = format!("{}/api/players/{}/config/hash", self.base_url, player_id);
        let body: ConfigHashResponse = self.get_json(&url).await?;
        Ok(body.config_hash)
    }

    /// Fetch the full config for a player
    pub async fn fetch_config(&self, player_id: &str) -> Result<ConfigSnapshot, FetchError> {
        let url = format!("{}/api/players/{}/config", self.base_url, player_id);
        self.get_json(&url).await
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// `dest` is created or truncated. On error it may hold a partial body;
    /// cleaning it up is the caller's job.
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .timeout(self.download_timeout)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::HttpError(response.status().as_u16()));
        }

        let mut file = File::create(dest).await?;
        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.sync_all().await?;

        Ok(written)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(self.request_timeout)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::HttpError(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::InvalidJson {
            url: url.to_string(),
            source: e,
        })
    }
}

/// Errors that can occur when talking to the cloud API
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered with something other than 200
    #[error("HTTP error: {0}")]
    HttpError(u16),

    /// Network/request error, including timeouts
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Response body was not the expected JSON
    #[error("Invalid JSON from {url}: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Writing the downloaded body failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FetchError {
    /// True for request timeouts
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::NetworkError(e) if e.is_timeout())
    }
}
