//! End-to-end sync cycle tests against a mock cloud

use std::time::{Duration, SystemTime};

use atlas_core::cache::{CycleStage, LockManager, SkipReason, SyncOrchestrator};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{asset, cache_config, file_names, mount_config, mount_media, PLAYER};

async fn orchestrator(temp: &TempDir, server: &MockServer) -> SyncOrchestrator {
    SyncOrchestrator::new(&cache_config(temp.path(), server)).unwrap()
}

#[tokio::test]
async fn test_first_sync_downloads_everything() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let a1 = asset("a1", "a1.png", b"one");
    let a2 = asset("a2", "a2.mp4", b"two");
    mount_config(&server, "h1", &[a1, a2]).await;
    mount_media(&server, "a1.png", b"one").await;
    mount_media(&server, "a2.mp4", b"two").await;
    let orch = orchestrator(&temp, &server).await;

    let outcome = orch.run_cycle(PLAYER).await.unwrap();

    assert!(outcome.success);
    assert_eq!((outcome.downloaded, outcome.failed, outcome.removed), (2, 0, 0));
    let layout = orch.layout();
    assert_eq!(
        file_names(&layout.good_cache_dir()),
        vec!["a1.png", "a2.mp4", "manifest.json"]
    );
    assert_eq!(orch.manifest_store().load().await.len(), 2);
    assert_eq!(orch.config_store().cached_hash().await.as_deref(), Some("h1"));
    assert!(!orch.lock_manager().is_locked().await);
    assert_eq!(*orch.subscribe_stage().borrow(), CycleStage::Unlocked);
}

#[tokio::test]
async fn test_unchanged_hash_skips_config_fetch() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let a1 = asset("a1", "a1.png", b"one");
    mount_config(&server, "h1", &[a1]).await;
    Mock::given(method("GET"))
        .and(path("/media/a1.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"one".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let orch = orchestrator(&temp, &server).await;

    let first = orch.run_cycle(PLAYER).await.unwrap();
    assert_eq!(first.downloaded, 1);

    let second = orch.run_cycle(PLAYER).await.unwrap();
    assert!(second.success);
    assert_eq!(second.reason, Some(SkipReason::Unchanged));
    assert_eq!(second.downloaded, 0);
}

#[tokio::test]
async fn test_removed_asset_goes_to_stale() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let a1 = asset("a1", "a1.png", b"one");
    let a2 = asset("a2", "a2.mp4", b"two");
    mount_config(&server, "h1", &[a1.clone(), a2]).await;
    mount_media(&server, "a1.png", b"one").await;
    mount_media(&server, "a2.mp4", b"two").await;
    let orch = orchestrator(&temp, &server).await;
    orch.run_cycle(PLAYER).await.unwrap();

    server.reset().await;
    mount_config(&server, "h2", &[a1]).await;
    let outcome = orch.run_cycle(PLAYER).await.unwrap();

    assert!(outcome.success);
    assert_eq!((outcome.downloaded, outcome.failed, outcome.removed), (0, 0, 1));
    let layout = orch.layout();
    assert_eq!(file_names(&layout.stale_dir()), vec!["a2.mp4"]);
    assert!(!layout.good_cache_dir().join("a2.mp4").exists());
    let manifest = orch.manifest_store().load().await;
    assert!(manifest.contains_key("a1"));
    assert!(!manifest.contains_key("a2"));
}

#[tokio::test]
async fn test_one_failed_asset_does_not_abort_cycle() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let a1 = asset("a1", "a1.png", b"one");
    let a2 = asset("a2", "a2.mp4", b"two");
    mount_config(&server, "h1", &[a1, a2]).await;
    mount_media(&server, "a1.png", b"one").await;
    // a2 is not served: 404
    let orch = orchestrator(&temp, &server).await;

    let outcome = orch.run_cycle(PLAYER).await.unwrap();

    assert!(!outcome.success);
    assert_eq!((outcome.downloaded, outcome.failed), (1, 1));
    let manifest = orch.manifest_store().load().await;
    assert!(manifest.contains_key("a1"));
    assert!(!manifest.contains_key("a2"));
    assert!(file_names(&orch.layout().downloading_dir()).is_empty());
    assert!(!orch.lock_manager().is_locked().await);
}

#[tokio::test]
async fn test_checksum_mismatch_keeps_playing_old_version() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let v1 = asset("a1", "a1.png", b"version one");
    mount_config(&server, "h1", &[v1.clone()]).await;
    mount_media(&server, "a1.png", b"version one").await;
    let orch = orchestrator(&temp, &server).await;
    orch.run_cycle(PLAYER).await.unwrap();

    server.reset().await;
    let v2 = asset("a1", "a1.png", b"version two");
    mount_config(&server, "h2", &[v2]).await;
    mount_media(&server, "a1.png", b"truncated").await;
    let outcome = orch.run_cycle(PLAYER).await.unwrap();

    assert_eq!((outcome.downloaded, outcome.failed), (0, 1));
    let layout = orch.layout();
    assert_eq!(
        std::fs::read(layout.good_cache_dir().join("a1.png")).unwrap(),
        b"version one"
    );
    let manifest = orch.manifest_store().load().await;
    assert_eq!(manifest["a1"].checksum, v1.checksum.unwrap());
}

#[tokio::test]
async fn test_updated_asset_is_swapped() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_config(&server, "h1", &[asset("a1", "a1.png", b"v1")]).await;
    mount_media(&server, "a1.png", b"v1").await;
    let orch = orchestrator(&temp, &server).await;
    orch.run_cycle(PLAYER).await.unwrap();

    server.reset().await;
    let v2 = asset("a1", "a1.png", b"v2");
    mount_config(&server, "h2", &[v2.clone()]).await;
    mount_media(&server, "a1.png", b"v2").await;
    let outcome = orch.run_cycle(PLAYER).await.unwrap();

    assert_eq!(outcome.downloaded, 1);
    let layout = orch.layout();
    assert_eq!(std::fs::read(layout.good_cache_dir().join("a1.png")).unwrap(), b"v2");
    assert_eq!(std::fs::read(layout.stale_dir().join("a1.png")).unwrap(), b"v1");
    assert_eq!(
        orch.manifest_store().load().await["a1"].checksum,
        v2.checksum.unwrap()
    );
}

#[tokio::test]
async fn test_changed_extension_retires_old_file() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_config(&server, "h1", &[asset("a1", "a1.png", b"png bytes")]).await;
    mount_media(&server, "a1.png", b"png bytes").await;
    let orch = orchestrator(&temp, &server).await;
    orch.run_cycle(PLAYER).await.unwrap();

    server.reset().await;
    mount_config(&server, "h2", &[asset("a1", "a1.jpg", b"jpg bytes")]).await;
    mount_media(&server, "a1.jpg", b"jpg bytes").await;
    let outcome = orch.run_cycle(PLAYER).await.unwrap();

    assert_eq!((outcome.downloaded, outcome.failed), (1, 0));
    let layout = orch.layout();
    assert_eq!(
        file_names(&layout.good_cache_dir()),
        vec!["a1.jpg", "manifest.json"]
    );
    assert_eq!(file_names(&layout.stale_dir()), vec!["a1.png"]);
    assert_eq!(
        orch.manifest_store().load().await["a1"].local_path,
        layout.good_cache_dir().join("a1.jpg")
    );
}

#[tokio::test]
async fn test_resync_of_same_playlist_changes_nothing() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let assets = [asset("a1", "a1.png", b"one"), asset("a2", "a2.mp4", b"two")];
    mount_config(&server, "h1", &assets).await;
    mount_media(&server, "a1.png", b"one").await;
    mount_media(&server, "a2.mp4", b"two").await;
    let orch = orchestrator(&temp, &server).await;
    orch.run_cycle(PLAYER).await.unwrap();
    let manifest_before = orch.manifest_store().load().await;

    // New hash, same assets: the diff must come out empty
    server.reset().await;
    mount_config(&server, "h2", &assets).await;
    let outcome = orch.run_cycle(PLAYER).await.unwrap();

    assert!(outcome.success);
    assert_eq!((outcome.downloaded, outcome.failed, outcome.removed), (0, 0, 0));
    let layout = orch.layout();
    assert_eq!(
        file_names(&layout.good_cache_dir()),
        vec!["a1.png", "a2.mp4", "manifest.json"]
    );
    assert!(file_names(&layout.stale_dir()).is_empty());
    assert_eq!(orch.manifest_store().load().await, manifest_before);
}

#[tokio::test]
async fn test_swap_one_asset_for_another_in_one_cycle() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_config(&server, "h1", &[asset("a1", "a1.png", b"one")]).await;
    mount_media(&server, "a1.png", b"one").await;
    let orch = orchestrator(&temp, &server).await;
    orch.run_cycle(PLAYER).await.unwrap();

    server.reset().await;
    mount_config(&server, "h2", &[asset("a2", "a2.mp4", b"two")]).await;
    mount_media(&server, "a2.mp4", b"two").await;
    let outcome = orch.run_cycle(PLAYER).await.unwrap();

    assert!(outcome.success);
    assert_eq!((outcome.downloaded, outcome.failed, outcome.removed), (1, 0, 1));
    let layout = orch.layout();
    assert_eq!(
        file_names(&layout.good_cache_dir()),
        vec!["a2.mp4", "manifest.json"]
    );
    assert_eq!(file_names(&layout.stale_dir()), vec!["a1.png"]);
    let manifest = orch.manifest_store().load().await;
    assert_eq!(manifest.keys().collect::<Vec<_>>(), vec!["a2"]);
}

#[tokio::test]
async fn test_held_lock_skips_cycle() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let orch = orchestrator(&temp, &server).await;
    orch.layout().ensure_dirs().await.unwrap();
    let other = LockManager::new(orch.layout().lock_file());
    assert!(other.acquire().await.unwrap());

    let outcome = orch.run_cycle(PLAYER).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.reason, Some(SkipReason::Locked));
    // The other holder's lock is untouched
    assert!(other.is_locked().await);
}

#[tokio::test]
async fn test_abandoned_lock_is_taken_over() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_config(&server, "h1", &[asset("a1", "a1.png", b"one")]).await;
    mount_media(&server, "a1.png", b"one").await;
    let orch = orchestrator(&temp, &server).await;
    orch.layout().ensure_dirs().await.unwrap();

    let lock_file = orch.layout().lock_file();
    std::fs::write(&lock_file, r#"{"pid":99999,"timestamp":"2020-01-01T00:00:00Z"}"#).unwrap();
    let file = std::fs::File::options().write(true).open(&lock_file).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(11 * 60))
        .unwrap();
    drop(file);

    let outcome = orch.run_cycle(PLAYER).await.unwrap();
    assert_eq!(outcome.downloaded, 1);
    assert!(!lock_file.exists());
}

#[tokio::test]
async fn test_hash_check_failure_aborts_and_unlocks() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/players/{}/config/hash", PLAYER)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let orch = orchestrator(&temp, &server).await;

    assert!(orch.run_cycle(PLAYER).await.is_err());
    assert!(!orch.lock_manager().is_locked().await);
    assert!(orch.config_store().load().await.is_none());
}

#[tokio::test]
async fn test_empty_playlist_saves_config_only() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_config(&server, "h1", &[]).await;
    let orch = orchestrator(&temp, &server).await;

    let outcome = orch.run_cycle(PLAYER).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.reason, Some(SkipReason::NoAssets));
    assert_eq!(orch.config_store().cached_hash().await.as_deref(), Some("h1"));
}

#[tokio::test]
async fn test_leftover_staging_files_are_cleared() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_config(&server, "h1", &[asset("a1", "a1.png", b"one")]).await;
    mount_media(&server, "a1.png", b"one").await;
    let orch = orchestrator(&temp, &server).await;
    orch.layout().ensure_dirs().await.unwrap();
    std::fs::write(orch.layout().downloading_dir().join("old.mp4"), b"partial").unwrap();

    orch.run_cycle(PLAYER).await.unwrap();

    assert!(file_names(&orch.layout().downloading_dir()).is_empty());
}
