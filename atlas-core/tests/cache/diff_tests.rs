//! Tests for the download/remove plan

use std::path::PathBuf;

use atlas_core::cache::{diff_assets, Asset, Manifest, ManifestEntry};
use chrono::Utc;

use super::asset;

fn cached(asset: &Asset, checksum: &str) -> ManifestEntry {
    ManifestEntry {
        local_path: PathBuf::from(format!("/cache/content/good_cache/{}", asset.cache_file_name())),
        checksum: checksum.to_string(),
        filename: asset.filename.clone(),
        media_type: asset.media_type.clone(),
        downloaded_at: Utc::now(),
    }
}

#[test]
fn test_empty_manifest_downloads_everything() {
    let assets = vec![asset("a1", "a1.png", b"1"), asset("a2", "a2.mp4", b"2")];
    let diff = diff_assets(&assets, &Manifest::new());

    let ids: Vec<&str> = diff.to_download.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2"]);
    assert!(diff.to_remove.is_empty());
}

#[test]
fn test_matching_checksum_is_skipped() {
    let a1 = asset("a1", "a1.png", b"1");
    let mut manifest = Manifest::new();
    manifest.insert("a1".into(), cached(&a1, a1.checksum.as_deref().unwrap()));

    let assets = [a1];
    let diff = diff_assets(&assets, &manifest);
    assert!(diff.is_empty());
}

#[test]
fn test_changed_checksum_is_downloaded() {
    let a1 = asset("a1", "a1.png", b"new");
    let mut manifest = Manifest::new();
    manifest.insert("a1".into(), cached(&a1, "sha256:old"));

    let assets = [a1];
    let diff = diff_assets(&assets, &manifest);
    assert_eq!(diff.to_download.len(), 1);
}

#[test]
fn test_cached_asset_without_declared_checksum_is_kept() {
    let mut a1 = asset("a1", "a1.png", b"1");
    a1.checksum = None;
    let mut manifest = Manifest::new();
    manifest.insert("a1".into(), cached(&a1, "sha256:whatever"));

    let assets = [a1];
    assert!(diff_assets(&assets, &manifest).is_empty());
}

#[test]
fn test_ids_missing_from_server_are_removed() {
    let a1 = asset("a1", "a1.png", b"1");
    let a2 = asset("a2", "a2.png", b"2");
    let mut manifest = Manifest::new();
    manifest.insert("a1".into(), cached(&a1, a1.checksum.as_deref().unwrap()));
    manifest.insert("a2".into(), cached(&a2, a2.checksum.as_deref().unwrap()));

    let assets = [a1];
    let diff = diff_assets(&assets, &manifest);
    assert!(diff.to_download.is_empty());
    assert_eq!(diff.to_remove, vec!["a2".to_string()]);
}
