// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync Orchestrator
//!
//! Runs one end-to-end sync cycle:
//! lock → check hash → fetch config → diff → download/swap → remove stale
//! → save manifest → unlock.
//!
//! A single asset failing never aborts the cycle. Errors while checking the
//! hash or fetching the config abort the cycle, and the lock is released on
//! every exit path.

use std::path::Path;

use chrono::Utc;
use tokio::fs;
use tokio::sync::watch;

use super::config::CacheConfig;
use super::diff::diff_assets;
use super::downloader::AssetDownloader;
use super::error::CacheError;
use super::fetcher::CloudApi;
use super::layout::CacheLayout;
use super::lock::LockManager;
use super::manifest::ManifestStore;
use super::snapshot::ConfigStore;
use super::stale::move_to_stale;
use super::types::{ManifestEntry, SkipReason, SyncOutcome};

/// Where a cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    /// No cycle has run yet
    Idle,
    Locked,
    CheckingHash,
    FetchingConfig,
    Diffing,
    /// Downloading and swapping asset `index` of `total` (1-based)
    Downloading { index: usize, total: usize },
    RemovingStale,
    UpdatingManifest,
    /// Last cycle finished and released the lock
    Unlocked,
}

/// Drives sync cycles against the cache.
#[derive(Debug)]
pub struct SyncOrchestrator {
    layout: CacheLayout,
    api: CloudApi,
    lock: LockManager,
    manifest: ManifestStore,
    config_store: ConfigStore,
    downloader: AssetDownloader,
    stage: watch::Sender<CycleStage>,
}

impl SyncOrchestrator {
    /// Create an orchestrator for the cache described by `config`
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let layout = CacheLayout::new(&config.root);
        let api = CloudApi::new(config)?;
        let lock = LockManager::new(layout.lock_file()).with_stale_after(config.lock_stale_after);
        let (stage, _) = watch::channel(CycleStage::Idle);

        Ok(Self {
            manifest: ManifestStore::new(layout.manifest_file()),
            config_store: ConfigStore::new(layout.config_file()),
            downloader: AssetDownloader::new(api.clone(), layout.clone()),
            lock,
            api,
            layout,
            stage,
        })
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock
    }

    pub fn manifest_store(&self) -> &ManifestStore {
        &self.manifest
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config_store
    }

    /// Watch the stage of the running cycle.
    pub fn subscribe_stage(&self) -> watch::Receiver<CycleStage> {
        self.stage.subscribe()
    }

    /// Run one sync cycle for `player_id`.
    ///
    /// Returns a `locked` outcome without doing anything if another cycle
    /// holds the lock. `Err` means the cycle was aborted (network trouble
    /// while checking or fetching the config, or the manifest could not be
    /// written); files already swapped stay swapped.
    pub async fn run_cycle(&self, player_id: &str) -> Result<SyncOutcome, CacheError> {
        self.layout.ensure_dirs().await?;

        let Some(guard) = self.lock.try_lock().await? else {
            return Ok(SyncOutcome::skipped(SkipReason::Locked));
        };
        self.set_stage(CycleStage::Locked);

        let result = self.run_locked(player_id).await;

        if let Err(e) = guard.release().await {
            tracing::warn!(error = %e, "failed to release cache lock");
        }
        self.set_stage(CycleStage::Unlocked);

        match &result {
            Ok(outcome) => tracing::info!(
                success = outcome.success,
                downloaded = outcome.downloaded,
                failed = outcome.failed,
                removed = outcome.removed,
                reason = ?outcome.reason,
                "sync cycle finished"
            ),
            Err(e) => tracing::error!(error = %e, "sync cycle aborted"),
        }
        result
    }

    async fn run_locked(&self, player_id: &str) -> Result<SyncOutcome, CacheError> {
        self.clear_staging().await;

        self.set_stage(CycleStage::CheckingHash);
        let cached_hash = self.config_store.cached_hash().await;
        let server_hash = self.api.fetch_config_hash(player_id).await?;
        if cached_hash.as_deref() == Some(server_hash.as_str()) {
            tracing::info!(config_hash = %server_hash, "config unchanged, skipping sync");
            return Ok(SyncOutcome::skipped(SkipReason::Unchanged));
        }

        self.set_stage(CycleStage::FetchingConfig);
        let config = self.api.fetch_config(player_id).await?;
        self.config_store.save(&config).await?;

        let assets = config.assets();
        if assets.is_empty() {
            tracing::info!("no playlist assets, nothing to sync");
            return Ok(SyncOutcome::skipped(SkipReason::NoAssets));
        }

        self.set_stage(CycleStage::Diffing);
        let mut manifest = self.manifest.load().await;
        let diff = diff_assets(assets, &manifest);
        tracing::info!(
            to_download = diff.to_download.len(),
            to_remove = diff.to_remove.len(),
            "sync plan"
        );

        let total = diff.to_download.len();
        let mut downloaded = 0;
        let mut failed = 0;
        for (i, asset) in diff.to_download.iter().enumerate() {
            self.set_stage(CycleStage::Downloading {
                index: i + 1,
                total,
            });
            match self.downloader.download(asset).await {
                Ok(done) => {
                    let previous = manifest.insert(
                        asset.id.clone(),
                        ManifestEntry {
                            local_path: done.path.clone(),
                            checksum: done.checksum,
                            filename: asset.filename.clone(),
                            media_type: asset.media_type.clone(),
                            downloaded_at: Utc::now(),
                        },
                    );
                    downloaded += 1;
                    // A renamed asset leaves its old file behind in good_cache
                    if let Some(previous) = previous.filter(|p| p.local_path != done.path) {
                        self.retire_replaced(&asset.id, &previous.local_path).await;
                    }
                }
                Err(_) => failed += 1,
            }
        }

        self.set_stage(CycleStage::RemovingStale);
        let mut removed = 0;
        for id in &diff.to_remove {
            let Some(entry) = manifest.remove(id) else {
                continue;
            };
            let stale = self.layout.stale_path_for(&entry.local_path);
            match move_to_stale(&entry.local_path, &stale).await {
                Ok(true) => removed += 1,
                Ok(false) => tracing::debug!(asset_id = %id, "cached file already gone"),
                Err(e) => tracing::warn!(asset_id = %id, error = %e, "could not move file to stale"),
            }
        }

        self.set_stage(CycleStage::UpdatingManifest);
        self.manifest.save(&manifest).await?;

        Ok(SyncOutcome::completed(downloaded, failed, removed))
    }

    async fn retire_replaced(&self, id: &str, old_path: &Path) {
        let stale = self.layout.stale_path_for(old_path);
        match move_to_stale(old_path, &stale).await {
            Ok(true) => tracing::info!(asset_id = %id, path = %old_path.display(), "retired replaced file"),
            Ok(false) => {}
            Err(e) => tracing::warn!(asset_id = %id, error = %e, "could not retire replaced file"),
        }
    }

    /// Drop leftovers of interrupted downloads. Only called under the lock.
    async fn clear_staging(&self) {
        let Ok(mut entries) = fs::read_dir(self.layout.downloading_dir()).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if fs::remove_file(entry.path()).await.is_ok() {
                tracing::debug!(path = %entry.path().display(), "removed leftover staging file");
            }
        }
    }

    fn set_stage(&self, stage: CycleStage) {
        tracing::trace!(?stage, "cycle stage");
        self.stage.send_replace(stage);
    }
}
