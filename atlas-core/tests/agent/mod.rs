// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for the player agent
//!
//! The cloud API is served by wiremock and the control channel runs over
//! the mock transport.

mod sync_tests;

use std::path::Path;
use std::time::Duration;

use atlas_core::cache::{checksum_bytes, Asset};
use atlas_core::network::Registration;
use atlas_core::{AgentConfig, AgentEvent, PlayerAgent};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PLAYER: &str = "p1";
pub const BODY: &[u8] = b"lobby image bytes";

pub fn asset() -> Asset {
    Asset {
        id: "a1".into(),
        filename: "a1.png".into(),
        media_type: "image".into(),
        url: "/media/a1.png".into(),
        checksum: Some(checksum_bytes(BODY)),
        order: Some(1),
        duration: Some(15.0),
    }
}

pub fn agent_config(dir: &Path, server: &MockServer) -> AgentConfig {
    AgentConfig::with_cache_root(dir.join("cache"))
        .with_server_url(server.uri())
        .with_device_token("test-token")
        .with_sync_state_file(dir.join("sync_state.json"))
        .with_enrollment_file(dir.join("enrollment.flag"))
        .with_cpuinfo_path(dir.join("cpuinfo"))
}

/// Persists a player id as a previous run would have.
pub fn remember_player(dir: &Path) {
    std::fs::write(
        dir.join("sync_state.json"),
        json!({ "playerId": PLAYER }).to_string(),
    )
    .unwrap();
}

pub fn registration() -> Registration {
    Registration {
        hardware_id: "10000000abc12345".into(),
        device_id: "dev-uuid-1".into(),
        name: "Atlas-c12345".into(),
    }
}

/// Serves one playlist with a single asset under config hash `hash`.
pub async fn mount_cloud(server: &MockServer, hash: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/players/{}/config/hash", PLAYER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "config_hash": hash })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/players/{}/config", PLAYER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "config_hash": hash,
            "playlist": {
                "id": "pl1",
                "name": "Lobby",
                "total_duration": 15.0,
                "assets": [asset()],
            },
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/a1.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY.to_vec()))
        .mount(server)
        .await;
}

pub async fn new_agent(dir: &TempDir, server: &MockServer) -> PlayerAgent {
    PlayerAgent::new(agent_config(dir.path(), server))
        .await
        .unwrap()
}

/// Waits for the first event matching `pred`, skipping the others.
pub async fn wait_for_event(
    events: &mut broadcast::Receiver<AgentEvent>,
    pred: impl Fn(&AgentEvent) -> bool,
) -> AgentEvent {
    timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for agent event")
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
