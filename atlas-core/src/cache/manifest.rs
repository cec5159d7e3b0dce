// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Manifest store
//!
//! The manifest records which assets are verified and present in the good
//! cache. Loading never fails: a missing or corrupt file reads as an empty
//! manifest, which makes the next cycle redownload everything.

use std::path::{Path, PathBuf};

use tokio::fs;

use super::error::CacheError;
use super::layout::atomic_write;
use super::types::Manifest;

/// Durable asset id → [`ManifestEntry`](super::ManifestEntry) map.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest, or an empty one if absent or unreadable.
    pub async fn load(&self) -> Manifest {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(_) => return Manifest::new(),
        };

        match serde_json::from_slice(&data) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "corrupt manifest, treating as empty"
                );
                Manifest::new()
            }
        }
    }

    /// Replace the whole manifest file.
    pub async fn save(&self, manifest: &Manifest) -> Result<(), CacheError> {
        let data = serde_json::to_vec_pretty(manifest)?;
        atomic_write(&self.path, &data).await?;
        Ok(())
    }
}
