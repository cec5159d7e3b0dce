// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Data model for the content cache
//!
//! These types mirror the JSON documents exchanged with the cloud API and
//! the files kept under the cache root (config snapshot, manifest, lock).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default on-screen duration (seconds) for assets that don't declare one.
pub const DEFAULT_ASSET_DURATION: f64 = 10.0;

/// A server-declared media item in a playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Opaque identifier, unique within a playlist
    pub id: String,
    /// Original filename (its extension names the cached file)
    pub filename: String,
    /// Media type ("image", "video", ...)
    #[serde(rename = "type", default)]
    pub media_type: String,
    /// Absolute URL, or a path relative to the server base URL
    pub url: String,
    /// Checksum in format "sha256:hexstring"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Display order within the playlist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Display duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Asset {
    /// The checksum the server declared, treating an empty string as absent.
    pub fn declared_checksum(&self) -> Option<&str> {
        self.checksum.as_deref().filter(|c| !c.is_empty())
    }

    /// Extension of the original filename, including the dot (or empty).
    pub fn extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default()
    }

    /// Name of the cached file: asset id plus the original extension.
    pub fn cache_file_name(&self) -> String {
        format!("{}{}", self.id, self.extension())
    }
}

/// Playlist section of a config snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
    /// Fields the cache doesn't interpret, kept so the snapshot persists intact
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The player configuration as served by the cloud.
///
/// Exactly one snapshot is current; a new `config_hash` replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Opaque version token
    pub config_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<Playlist>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ConfigSnapshot {
    /// Assets of the current playlist (empty when there is no playlist).
    pub fn assets(&self) -> &[Asset] {
        self.playlist
            .as_ref()
            .map(|p| p.assets.as_slice())
            .unwrap_or(&[])
    }
}

/// A verified file sitting in the good cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub local_path: PathBuf,
    /// Server-supplied checksum, or the digest computed after download
    pub checksum: String,
    pub filename: String,
    #[serde(rename = "type", default)]
    pub media_type: String,
    pub downloaded_at: DateTime<Utc>,
}

/// Asset id → cached file metadata. Ordered so the file is stable across saves.
pub type Manifest = BTreeMap<String, ManifestEntry>;

/// Contents of the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub pid: u32,
    pub timestamp: DateTime<Utc>,
}

/// Why a cycle ended without doing any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Another cycle holds the cache lock
    Locked,
    /// Server config hash matches the cached one
    Unchanged,
    /// The fetched config declares no assets
    NoAssets,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::Locked => "locked",
            SkipReason::Unchanged => "unchanged",
            SkipReason::NoAssets => "no_assets",
        };
        f.write_str(s)
    }
}

/// Result record of one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// True when no asset failed
    pub success: bool,
    pub downloaded: usize,
    pub failed: usize,
    pub removed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
}

impl SyncOutcome {
    /// Outcome of a cycle that stopped before touching any asset.
    pub fn skipped(reason: SkipReason) -> Self {
        SyncOutcome {
            success: reason != SkipReason::Locked,
            downloaded: 0,
            failed: 0,
            removed: 0,
            reason: Some(reason),
        }
    }

    /// Outcome of a cycle that ran the download/remove phases.
    pub fn completed(downloaded: usize, failed: usize, removed: usize) -> Self {
        SyncOutcome {
            success: failed == 0,
            downloaded,
            failed,
            removed,
            reason: None,
        }
    }

    /// True when the cycle changed what is on screen.
    pub fn content_changed(&self) -> bool {
        self.downloaded > 0 || self.removed > 0
    }
}

/// One asset of the current playlist, resolved against the local cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderableAsset {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub filename: String,
    pub local_path: Option<PathBuf>,
    pub duration: f64,
    pub order: Option<i64>,
    pub available: bool,
}

/// What the renderer may show right now, using only on-disk state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderableContent {
    pub playlist_id: Option<String>,
    pub playlist_name: Option<String>,
    pub total_duration: Option<f64>,
    pub config_hash: String,
    /// Only the assets that currently resolve to a local file
    pub assets: Vec<RenderableAsset>,
}
