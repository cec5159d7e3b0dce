// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Content cache engine
//!
//! Keeps a verified local copy of every asset in the server-declared
//! playlist:
//! - Downloads stage into `downloading/`, are verified with SHA-256 and
//!   swapped atomically into `good_cache/`
//! - Displaced and removed files are parked in `stale/` until swept by age
//! - A manifest records what is verified and present
//! - A lock file keeps sync cycles from overlapping
//!
//! The offline reader answers from disk alone when the network is gone.

mod config;
mod diff;
mod downloader;
mod error;
mod fetcher;
mod integrity;
mod layout;
mod lock;
mod manifest;
mod offline;
mod orchestrator;
mod snapshot;
mod stale;
mod types;

pub use config::{CacheConfig, DEFAULT_CACHE_ROOT, DEFAULT_SERVER_URL, LOCK_STALE_AFTER};
pub use diff::{diff_assets, AssetDiff};
pub use downloader::{AssetDownloader, DownloadError, DownloadedAsset};
pub use error::CacheError;
pub use fetcher::{CloudApi, FetchError};
pub use integrity::{
    checksum_bytes, checksums_match, compute_checksum, verify_checksum, IntegrityError,
};
pub use layout::CacheLayout;
pub(crate) use layout::atomic_write;
pub use lock::{LockGuard, LockManager};
pub use manifest::ManifestStore;
pub use offline::{OfflineCapability, OfflineReader};
pub use orchestrator::{CycleStage, SyncOrchestrator};
pub use snapshot::ConfigStore;
pub use stale::{clean_stale, move_to_stale, DEFAULT_STALE_MAX_AGE_DAYS};
pub use types::{
    Asset, ConfigSnapshot, LockRecord, Manifest, ManifestEntry, Playlist, RenderableAsset,
    RenderableContent, SkipReason, SyncOutcome, DEFAULT_ASSET_DURATION,
};
