//! Config snapshot store
//!
//! Holds the last config fetched from the cloud. Like the manifest, an
//! unreadable snapshot is treated as absent so the next cycle refetches it.

use std::path::{Path, PathBuf};

use tokio::fs;

use super::error::CacheError;
use super::layout::atomic_write;
use super::types::ConfigSnapshot;

/// Persistence for the current [`ConfigSnapshot`].
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The persisted snapshot, if present and parseable.
    pub async fn load(&self) -> Option<ConfigSnapshot> {
        let data = fs::read(&self.path).await.ok()?;
        match serde_json::from_slice(&data) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "corrupt config snapshot, ignoring");
                None
            }
        }
    }

    /// Hash of the persisted snapshot.
    pub async fn cached_hash(&self) -> Option<String> {
        self.load().await.map(|s| s.config_hash)
    }

    pub async fn save(&self, snapshot: &ConfigSnapshot) -> Result<(), CacheError> {
        let data = serde_json::to_vec_pretty(snapshot)?;
        atomic_write(&self.path, &data).await?;
        tracing::info!(config_hash = %snapshot.config_hash, "config saved");
        Ok(())
    }
}
