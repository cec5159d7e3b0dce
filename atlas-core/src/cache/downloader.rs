// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Asset downloader
//!
//! Fetches one asset into the staging area, verifies it, and promotes it
//! into the good cache. The final path always holds either the previous
//! good file or the new good file, never a partial write.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

use super::fetcher::{CloudApi, FetchError};
use super::integrity::{compute_checksum, verify_checksum, IntegrityError};
use super::layout::{exists, CacheLayout};
use super::stale::move_to_stale;
use super::types::Asset;

/// A verified asset now sitting at its final path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedAsset {
    pub path: PathBuf,
    /// Declared checksum, or the digest of the downloaded file
    pub checksum: String,
    pub bytes: u64,
}

/// Downloads assets with verify-then-swap semantics.
#[derive(Debug, Clone)]
pub struct AssetDownloader {
    api: CloudApi,
    layout: CacheLayout,
}

impl AssetDownloader {
    pub fn new(api: CloudApi, layout: CacheLayout) -> Self {
        Self { api, layout }
    }

    /// Download, verify and swap in a single asset.
    ///
    /// On any failure the staged file is removed and the final path is left
    /// as it was.
    pub async fn download(&self, asset: &Asset) -> Result<DownloadedAsset, DownloadError> {
        if !is_safe_id(&asset.id) {
            return Err(DownloadError::InvalidAssetId(asset.id.clone()));
        }

        let staging = self.layout.staging_path(asset);
        let result = self.fetch_and_swap(asset, &staging).await;

        match &result {
            Ok(done) => {
                tracing::info!(
                    asset_id = %asset.id,
                    filename = %asset.filename,
                    bytes = done.bytes,
                    path = %done.path.display(),
                    "cached asset"
                );
            }
            Err(e) => {
                if exists(&staging).await {
                    let _ = fs::remove_file(&staging).await;
                }
                tracing::warn!(
                    asset_id = %asset.id,
                    filename = %asset.filename,
                    error = %e,
                    "asset download failed"
                );
            }
        }

        result
    }

    async fn fetch_and_swap(
        &self,
        asset: &Asset,
        staging: &Path,
    ) -> Result<DownloadedAsset, DownloadError> {
        let final_path = self.layout.final_path(asset);
        let url = self.api.resolve_url(&asset.url);

        tracing::info!(asset_id = %asset.id, filename = %asset.filename, "downloading");
        let bytes = self.api.download_to(&url, staging).await?;

        let declared = asset.declared_checksum();
        if !verify_checksum(staging, declared).await? {
            return Err(DownloadError::ChecksumMismatch {
                filename: asset.filename.clone(),
                expected: declared.unwrap_or_default().to_string(),
            });
        }

        let checksum = match declared {
            Some(declared) => declared.to_string(),
            None => compute_checksum(staging).await?,
        };

        let stale = self.layout.stale_path_for(&final_path);
        swap_into_place(staging, &final_path, &stale).await?;

        Ok(DownloadedAsset {
            path: final_path,
            checksum,
            bytes,
        })
    }
}

/// Promote `staging` to `final_path`, parking any current file at `stale`.
///
/// Never overwrites in place. If the promotion fails the parked file is put
/// back, so `final_path` keeps serving the previous version.
async fn swap_into_place(staging: &Path, final_path: &Path, stale: &Path) -> std::io::Result<()> {
    let parked = exists(final_path).await && move_to_stale(final_path, stale).await?;

    if let Err(e) = fs::rename(staging, final_path).await {
        if parked {
            if let Err(restore) = fs::rename(stale, final_path).await {
                tracing::error!(
                    path = %final_path.display(),
                    error = %restore,
                    "could not restore previous version"
                );
            }
        }
        return Err(e);
    }
    Ok(())
}

/// Asset ids become file names, so they must not contain path syntax.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\', '\0'])
}

/// Why a single asset could not be cached
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The id can't be used as a file name
    #[error("Invalid asset id: {0:?}")]
    InvalidAssetId(String),

    /// Request or transfer failed
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// Downloaded bytes don't match the declared checksum
    #[error("Checksum mismatch for {filename}: expected {expected}")]
    ChecksumMismatch { filename: String, expected: String },

    /// Hashing the staged file failed
    #[error("{0}")]
    Integrity(#[from] IntegrityError),

    /// Moving files between cache areas failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
