//! Offline fallback reader
//!
//! Answers questions about the cache using only on-disk state. This is the
//! read path used by the renderer; it never mutates the cache.

use std::path::PathBuf;

use super::layout::{exists, CacheLayout};
use super::manifest::ManifestStore;
use super::snapshot::ConfigStore;
use super::types::{
    ConfigSnapshot, Manifest, RenderableAsset, RenderableContent, DEFAULT_ASSET_DURATION,
};

/// Whether the player can keep running without the network.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineCapability {
    /// A config snapshot and at least one cached asset exist
    pub can_operate: bool,
    pub config: Option<ConfigSnapshot>,
    pub asset_count: usize,
}

/// Read-only view over the cached config and manifest.
#[derive(Debug, Clone)]
pub struct OfflineReader {
    manifest: ManifestStore,
    config: ConfigStore,
}

impl OfflineReader {
    pub fn new(layout: &CacheLayout) -> Self {
        Self {
            manifest: ManifestStore::new(layout.manifest_file()),
            config: ConfigStore::new(layout.config_file()),
        }
    }

    /// Last persisted config snapshot.
    pub async fn cached_config(&self) -> Option<ConfigSnapshot> {
        self.config.load().await
    }

    /// Local path of a cached asset, if its file is still on disk.
    pub async fn cached_asset_path(&self, asset_id: &str) -> Option<PathBuf> {
        let manifest = self.manifest.load().await;
        resolve(&manifest, asset_id).await
    }

    pub async fn offline_capability(&self) -> OfflineCapability {
        let config = self.cached_config().await;
        let asset_count = self.manifest.load().await.len();

        OfflineCapability {
            can_operate: config.is_some() && asset_count > 0,
            config,
            asset_count,
        }
    }

    /// The cached playlist annotated with local paths, limited to assets
    /// that resolve to a file. `None` without a cached playlist.
    pub async fn renderable_content(&self) -> Option<RenderableContent> {
        let config = self.cached_config().await?;
        let playlist = config.playlist.as_ref()?;
        if playlist.assets.is_empty() {
            return None;
        }

        let manifest = self.manifest.load().await;
        let mut assets = Vec::with_capacity(playlist.assets.len());
        for asset in &playlist.assets {
            let local_path = resolve(&manifest, &asset.id).await;
            if local_path.is_none() {
                continue;
            }
            assets.push(RenderableAsset {
                id: asset.id.clone(),
                media_type: asset.media_type.clone(),
                filename: asset.filename.clone(),
                available: true,
                local_path,
                duration: asset.duration.unwrap_or(DEFAULT_ASSET_DURATION),
                order: asset.order,
            });
        }

        Some(RenderableContent {
            playlist_id: playlist.id.clone(),
            playlist_name: playlist.name.clone(),
            total_duration: playlist.total_duration,
            config_hash: config.config_hash.clone(),
            assets,
        })
    }
}

async fn resolve(manifest: &Manifest, asset_id: &str) -> Option<PathBuf> {
    let entry = manifest.get(asset_id)?;
    if exists(&entry.local_path).await {
        Some(entry.local_path.clone())
    } else {
        None
    }
}
