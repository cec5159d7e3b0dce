//! Tests for manifest and config snapshot persistence

use std::path::PathBuf;

use atlas_core::cache::{ConfigSnapshot, ConfigStore, Manifest, ManifestEntry, ManifestStore};
use chrono::Utc;
use tempfile::TempDir;

use super::{asset, config_json};

#[tokio::test]
async fn test_missing_manifest_is_empty() {
    let temp = TempDir::new().unwrap();
    let store = ManifestStore::new(temp.path().join("manifest.json"));
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn test_corrupt_manifest_is_empty() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("manifest.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = ManifestStore::new(&path);
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn test_manifest_file_format() {
    let temp = TempDir::new().unwrap();
    let store = ManifestStore::new(temp.path().join("manifest.json"));

    let mut manifest = Manifest::new();
    manifest.insert(
        "a1".into(),
        ManifestEntry {
            local_path: PathBuf::from("/cache/content/good_cache/a1.png"),
            checksum: "sha256:abc".into(),
            filename: "a1.png".into(),
            media_type: "image".into(),
            downloaded_at: Utc::now(),
        },
    );
    store.save(&manifest).await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
    assert_eq!(raw["a1"]["localPath"], "/cache/content/good_cache/a1.png");
    assert_eq!(raw["a1"]["type"], "image");
    assert!(raw["a1"]["downloadedAt"].is_string());

    assert_eq!(store.load().await, manifest);
}

#[tokio::test]
async fn test_config_snapshot_keeps_unknown_fields() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::new(temp.path().join("player_config.json"));
    assert!(store.cached_hash().await.is_none());

    let snapshot: ConfigSnapshot =
        serde_json::from_value(config_json("h1", &[asset("a1", "a1.png", b"1")])).unwrap();
    store.save(&snapshot).await.unwrap();

    assert_eq!(store.cached_hash().await.as_deref(), Some("h1"));
    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.extra["layout"], "fullscreen");
    assert_eq!(loaded.assets().len(), 1);
}
