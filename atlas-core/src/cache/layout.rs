// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! On-disk layout of the cache
//!
//! ```text
//! <root>/
//! ├── config/player_config.json      current config snapshot
//! ├── content/
//! │   ├── good_cache/                verified assets + manifest.json
//! │   ├── downloading/               staging area
//! │   └── stale/                     displaced versions, swept by age
//! └── locks/cache_update.lock        sync cycle lock record
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::types::Asset;

/// Paths of every file and directory the cache uses.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    /// Create a layout rooted at `root`. Nothing is created on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create every cache directory that doesn't exist yet.
    pub async fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [
            self.config_dir(),
            self.good_cache_dir(),
            self.downloading_dir(),
            self.stale_dir(),
            self.locks_dir(),
        ] {
            if fs::metadata(&dir).await.is_err() {
                fs::create_dir_all(&dir).await?;
                tracing::info!(dir = %dir.display(), "created cache directory");
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("player_config.json")
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join("content")
    }

    pub fn good_cache_dir(&self) -> PathBuf {
        self.content_dir().join("good_cache")
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.good_cache_dir().join("manifest.json")
    }

    pub fn downloading_dir(&self) -> PathBuf {
        self.content_dir().join("downloading")
    }

    pub fn stale_dir(&self) -> PathBuf {
        self.content_dir().join("stale")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.locks_dir().join("cache_update.lock")
    }

    /// Where an asset is downloaded before verification.
    pub fn staging_path(&self, asset: &Asset) -> PathBuf {
        self.downloading_dir().join(asset.cache_file_name())
    }

    /// Where a verified asset lives.
    pub fn final_path(&self, asset: &Asset) -> PathBuf {
        self.good_cache_dir().join(asset.cache_file_name())
    }

    /// Holding path in the stale area for a displaced cache file.
    pub fn stale_path_for(&self, cached_file: &Path) -> PathBuf {
        let name = cached_file
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        self.stale_dir().join(name)
    }
}

/// Atomic file write (write to temp, then rename)
///
/// Either the old content remains or the new content is fully written.
pub(crate) async fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let temp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, path).await
}

/// Returns true if something exists at `path`.
pub(crate) async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}
