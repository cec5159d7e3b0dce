//! Tests for on-demand sync and the query surface

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use atlas_core::cache::SkipReason;
use atlas_core::{AgentError, AgentEvent, CallbackHandler, SyncStateStore, SyncTrigger};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{mount_cloud, new_agent, remember_player, wait_for_event, BODY, PLAYER};

#[tokio::test]
async fn test_fresh_agent_status() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let agent = new_agent(&dir, &server).await;

    let status = agent.status().await;
    assert!(!status.is_online);
    assert!(!status.is_connected);
    assert_eq!(status.player_id, None);
    assert_eq!(status.last_sync_time, None);
    assert!(!status.sync_in_progress);
    assert_eq!(status.cached_assets, 0);
    assert!(!status.can_play_offline);

    assert!(agent.renderable_content().await.is_none());
    assert!(agent.orchestrator().layout().good_cache_dir().is_dir());
}

#[tokio::test]
async fn test_status_serializes_camel_case() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let agent = new_agent(&dir, &server).await;

    let json = serde_json::to_value(agent.status().await).unwrap();
    assert_eq!(json["isOnline"], false);
    assert_eq!(json["canPlayOffline"], false);
    assert!(json["lastSyncTime"].is_null());
}

#[tokio::test]
async fn test_sync_requires_player_id() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let agent = new_agent(&dir, &server).await;

    let result = agent.trigger_sync(SyncTrigger::Manual).await;
    assert!(matches!(result, Err(AgentError::NotRegistered)));
}

#[tokio::test]
async fn test_restores_persisted_player_id() {
    let dir = TempDir::new().unwrap();
    remember_player(dir.path());
    let server = MockServer::start().await;
    let agent = new_agent(&dir, &server).await;

    assert_eq!(agent.session().player_id().as_deref(), Some(PLAYER));
    assert_eq!(agent.status().await.player_id.as_deref(), Some(PLAYER));
}

#[tokio::test]
async fn test_manual_sync_fills_cache() {
    let dir = TempDir::new().unwrap();
    remember_player(dir.path());
    let server = MockServer::start().await;
    mount_cloud(&server, "h1").await;
    let agent = new_agent(&dir, &server).await;
    let mut events = agent.subscribe();

    let outcome = agent.trigger_sync(SyncTrigger::Manual).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.downloaded, 1);

    assert_eq!(
        wait_for_event(&mut events, |_| true).await,
        AgentEvent::ContentReady {
            downloaded: 1,
            removed: 0
        }
    );
    assert_eq!(
        wait_for_event(&mut events, |_| true).await,
        AgentEvent::SyncCompleted {
            outcome: outcome.clone()
        }
    );

    let status = agent.status().await;
    assert!(status.last_sync_time.is_some());
    assert_eq!(status.cached_assets, 1);
    assert!(status.can_play_offline);

    let content = agent.renderable_content().await.unwrap();
    assert_eq!(content.playlist_id, "pl1");
    assert_eq!(content.assets.len(), 1);
    let local = agent.cached_asset_path("a1").await.unwrap();
    assert_eq!(std::fs::read(local).unwrap(), BODY);

    // Last sync time survives a restart
    let persisted = SyncStateStore::load(dir.path().join("sync_state.json")).await;
    assert_eq!(
        persisted.snapshot().last_sync_time,
        status.last_sync_time
    );
    assert_eq!(persisted.snapshot().player_id.as_deref(), Some(PLAYER));
}

#[tokio::test]
async fn test_unchanged_config_does_not_announce_content() {
    let dir = TempDir::new().unwrap();
    remember_player(dir.path());
    let server = MockServer::start().await;
    mount_cloud(&server, "h1").await;
    let agent = new_agent(&dir, &server).await;

    agent.trigger_sync(SyncTrigger::Manual).await.unwrap();
    let mut events = agent.subscribe();
    let outcome = agent.trigger_sync(SyncTrigger::Poll).await.unwrap();

    assert_eq!(outcome.reason, Some(SkipReason::Unchanged));
    assert!(matches!(
        wait_for_event(&mut events, |_| true).await,
        AgentEvent::SyncCompleted { .. }
    ));
}

#[tokio::test]
async fn test_overlapping_trigger_is_skipped() {
    let dir = TempDir::new().unwrap();
    remember_player(dir.path());
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/players/{}/config/hash", PLAYER)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "config_hash": "h1" }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    mount_cloud(&server, "h1").await;
    let agent = new_agent(&dir, &server).await;

    let (first, second) = tokio::join!(
        agent.trigger_sync(SyncTrigger::Deploy),
        agent.trigger_sync(SyncTrigger::Poll)
    );

    assert_eq!(first.unwrap().downloaded, 1);
    assert_eq!(second.unwrap().reason, Some(SkipReason::Locked));
    assert!(!agent.status().await.sync_in_progress);
}

#[tokio::test]
async fn test_failed_sync_is_reported() {
    let dir = TempDir::new().unwrap();
    remember_player(dir.path());
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/players/{}/config/hash", PLAYER)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let agent = new_agent(&dir, &server).await;
    let mut events = agent.subscribe();

    let result = agent.trigger_sync(SyncTrigger::Manual).await;
    assert!(matches!(result, Err(AgentError::Cache(_))));

    match wait_for_event(&mut events, |_| true).await {
        AgentEvent::SyncFailed { error } => assert!(error.contains("500")),
        other => panic!("unexpected event: {:?}", other),
    }
    let status = agent.status().await;
    assert_eq!(status.last_sync_time, None);
    assert!(!status.sync_in_progress);
}

#[tokio::test]
async fn test_event_handlers_see_sync_events() {
    let dir = TempDir::new().unwrap();
    remember_player(dir.path());
    let server = MockServer::start().await;
    mount_cloud(&server, "h1").await;
    let agent = new_agent(&dir, &server).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    agent.add_event_handler(Arc::new(CallbackHandler::new(move |event: AgentEvent| {
        sink.lock().unwrap().push(event);
    })));

    agent.trigger_sync(SyncTrigger::Manual).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(matches!(seen[0], AgentEvent::ContentReady { .. }));
    assert!(matches!(seen[1], AgentEvent::SyncCompleted { .. }));
}

#[tokio::test]
async fn test_clean_stale_removes_old_files() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let agent = new_agent(&dir, &server).await;
    let stale_dir = agent.orchestrator().layout().stale_dir();

    let old = stale_dir.join("old.mp4");
    std::fs::write(&old, b"old").unwrap();
    std::fs::File::options()
        .write(true)
        .open(&old)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(10 * 24 * 60 * 60))
        .unwrap();
    let recent = stale_dir.join("recent.mp4");
    std::fs::write(&recent, b"recent").unwrap();

    assert_eq!(agent.clean_stale(7).await.unwrap(), 1);
    assert!(!old.exists());
    assert!(recent.exists());
}
