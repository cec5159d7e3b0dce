//! Configuration for the content cache

use std::path::PathBuf;
use std::time::Duration;

/// Default cache root on a provisioned player.
pub const DEFAULT_CACHE_ROOT: &str = "/home/signage/ODS/cache";

/// Default cloud API base URL.
pub const DEFAULT_SERVER_URL: &str = "https://api.ods-cloud.com";

/// A lock older than this is considered abandoned.
pub const LOCK_STALE_AFTER: Duration = Duration::from_secs(10 * 60);

/// Configuration for the content cache and its cloud API client
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root of the cache directory tree
    pub root: PathBuf,

    /// Cloud API base URL (e.g., "https://api.ods-cloud.com")
    pub server_url: String,

    /// Bearer token sent with every API request
    pub device_token: String,

    /// Timeout for the hash and config requests
    pub request_timeout: Duration,

    /// Timeout for a single asset download (media files can be large)
    pub download_timeout: Duration,

    /// Age after which a lock record may be overridden
    pub lock_stale_after: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_CACHE_ROOT),
            server_url: DEFAULT_SERVER_URL.to_string(),
            device_token: "system".to_string(),
            request_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(300),
            lock_stale_after: LOCK_STALE_AFTER,
        }
    }
}

impl CacheConfig {
    /// Use a different cache root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Use a different cloud API base URL
    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different device token
    pub fn with_device_token(mut self, token: impl Into<String>) -> Self {
        self.device_token = token.into();
        self
    }
}
