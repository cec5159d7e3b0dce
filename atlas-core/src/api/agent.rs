// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Player Agent
//!
//! Main entry point: ties the content cache, the cloud connection and the
//! scheduler together, and exposes the status/content queries the local
//! HTTP layer serves.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::config::AgentConfig;
use super::error::{AgentError, AgentResult};
use super::events::{AgentEvent, EventDispatcher, EventHandler};
use super::identity::{read_hardware_id, registration, Enrollment};
use crate::cache::{
    clean_stale, CacheLayout, ConfigSnapshot, LockManager, OfflineCapability, OfflineReader,
    RenderableContent, SkipReason, SyncOrchestrator, SyncOutcome,
};
use crate::network::{
    CloudConnection, ConnectionEvent, OutboundEvent, OutboundQueue, Registration, Session,
    SyncStatusReport, Transport,
};
use crate::sync::{Scheduler, SyncState, SyncStateStore, SyncTrigger};

const EVENT_BUFFER: usize = 64;

/// Snapshot answered by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub is_online: bool,
    pub is_connected: bool,
    pub player_id: Option<String>,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub sync_in_progress: bool,
    pub cached_assets: usize,
    pub can_play_offline: bool,
}

impl AgentStatus {
    /// Status as seen from outside a running agent, read from disk only.
    ///
    /// Creates nothing, so it is safe to call against a missing cache. A
    /// cycle counts as in progress while its lock file exists.
    pub async fn read(config: &AgentConfig) -> AgentStatus {
        let layout = CacheLayout::new(&config.cache.root);
        let state = SyncStateStore::load(&config.sync_state_file).await.snapshot();
        let offline = OfflineReader::new(&layout).offline_capability().await;
        AgentStatus {
            is_online: state.is_online,
            is_connected: false,
            player_id: state.player_id,
            last_sync_time: state.last_sync_time,
            sync_in_progress: LockManager::new(layout.lock_file()).is_locked().await,
            cached_assets: offline.asset_count,
            can_play_offline: offline.can_operate,
        }
    }
}

/// The on-device sync agent.
///
/// Cheap to clone; clones share the same session, state and cache.
///
/// # Example
///
/// ```ignore
/// use atlas_core::{AgentConfig, PlayerAgent};
/// use tokio_util::sync::CancellationToken;
///
/// let agent = PlayerAgent::new(AgentConfig::with_cache_root("/tmp/cache")).await?;
/// let shutdown = CancellationToken::new();
/// agent.run(shutdown.clone()).await?;
/// ```
#[derive(Clone)]
pub struct PlayerAgent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    config: AgentConfig,
    orchestrator: SyncOrchestrator,
    offline: OfflineReader,
    state: SyncStateStore,
    session: Arc<Session>,
    /// Taken by the first `run`.
    outbound: Mutex<Option<OutboundQueue>>,
    dispatcher: EventDispatcher,
    events: broadcast::Sender<AgentEvent>,
}

impl PlayerAgent {
    /// Creates the agent: prepares the cache directories and restores the
    /// persisted sync state. Nothing touches the network yet.
    pub async fn new(config: AgentConfig) -> AgentResult<Self> {
        let orchestrator = SyncOrchestrator::new(&config.cache)?;
        orchestrator.layout().ensure_dirs().await?;
        let offline = OfflineReader::new(orchestrator.layout());

        let state = SyncStateStore::load(&config.sync_state_file).await;
        let (session, outbound) = Session::new(state.snapshot().player_id);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        Ok(PlayerAgent {
            inner: Arc::new(AgentInner {
                config,
                orchestrator,
                offline,
                state,
                session,
                outbound: Mutex::new(Some(outbound)),
                dispatcher: EventDispatcher::new(),
                events,
            }),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.inner.config
    }

    /// Shared connection session.
    pub fn session(&self) -> Arc<Session> {
        self.inner.session.clone()
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.inner.orchestrator
    }

    /// Current sync state.
    pub fn sync_state(&self) -> SyncState {
        self.inner.state.snapshot()
    }

    /// Adds a callback for agent events.
    pub fn add_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.inner.dispatcher.add_handler(handler);
    }

    /// Receive agent events on a channel.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.inner.events.subscribe()
    }

    // === Sync ===

    /// Runs one sync cycle for the current player.
    ///
    /// A trigger arriving while a cycle runs in this process is dropped
    /// with a `locked` outcome. The result is reported over the control
    /// channel when connected.
    pub async fn trigger_sync(&self, trigger: SyncTrigger) -> AgentResult<SyncOutcome> {
        let player_id = self
            .inner
            .session
            .player_id()
            .ok_or(AgentError::NotRegistered)?;

        let Some(_running) = self.inner.state.begin_sync() else {
            tracing::info!(?trigger, "sync already in progress, skipping");
            return Ok(SyncOutcome::skipped(SkipReason::Locked));
        };

        tracing::info!(?trigger, player_id = %player_id, "starting content sync");
        match self.inner.orchestrator.run_cycle(&player_id).await {
            Ok(outcome) => {
                if outcome.reason != Some(SkipReason::Locked) {
                    let now = Utc::now();
                    self.inner
                        .state
                        .update(|s| s.last_sync_time = Some(now))
                        .await;
                    self.inner.session.send(OutboundEvent::SyncStatus(
                        SyncStatusReport::from_outcome(&outcome, now),
                    ));
                    if outcome.content_changed() {
                        self.emit(AgentEvent::ContentReady {
                            downloaded: outcome.downloaded,
                            removed: outcome.removed,
                        });
                    }
                }
                self.emit(AgentEvent::SyncCompleted {
                    outcome: outcome.clone(),
                });
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(error = %e, "sync failed");
                let message = e.to_string();
                self.inner.session.send(OutboundEvent::SyncStatus(
                    SyncStatusReport::from_error(message.clone(), Utc::now()),
                ));
                self.emit(AgentEvent::SyncFailed { error: message });
                Err(e.into())
            }
        }
    }

    // === Queries ===

    /// Status for the local HTTP layer.
    pub async fn status(&self) -> AgentStatus {
        let state = self.inner.state.snapshot();
        let offline = self.inner.offline.offline_capability().await;
        AgentStatus {
            is_online: state.is_online,
            is_connected: self.inner.session.is_connected(),
            player_id: self.inner.session.player_id(),
            last_sync_time: state.last_sync_time,
            sync_in_progress: state.sync_in_progress,
            cached_assets: offline.asset_count,
            can_play_offline: offline.can_operate,
        }
    }

    /// What the renderer can show from the local cache.
    pub async fn renderable_content(&self) -> Option<RenderableContent> {
        self.inner.offline.renderable_content().await
    }

    pub async fn cached_config(&self) -> Option<ConfigSnapshot> {
        self.inner.offline.cached_config().await
    }

    pub async fn cached_asset_path(&self, asset_id: &str) -> Option<PathBuf> {
        self.inner.offline.cached_asset_path(asset_id).await
    }

    pub async fn offline_capability(&self) -> OfflineCapability {
        self.inner.offline.offline_capability().await
    }

    /// Deletes stale files older than `max_age_days`.
    pub async fn clean_stale(&self, max_age_days: u64) -> AgentResult<usize> {
        let stale_dir = self.inner.orchestrator.layout().stale_dir();
        Ok(clean_stale(&stale_dir, max_age_days).await?)
    }

    // === Lifecycle ===

    /// Connects to the cloud and runs until `shutdown` is cancelled.
    ///
    /// Returns immediately when the device is not enrolled.
    pub async fn run(&self, shutdown: CancellationToken) -> AgentResult<()> {
        let config = &self.inner.config;
        let Some(enrollment) = Enrollment::load(&config.enrollment_file).await else {
            tracing::info!("skipping cloud sync, player not enrolled");
            return Ok(());
        };
        let hardware_id = read_hardware_id(&config.cpuinfo_path).await;
        let registration = registration(&enrollment, &hardware_id);
        tracing::info!(
            server = %config.transport.server_url,
            name = %registration.name,
            "connecting to cloud"
        );

        let connection = self
            .connection(registration)?
            .with_default_transports();
        self.drive(connection, shutdown).await
    }

    /// Like [`run`](Self::run) with explicit transports and registration.
    pub async fn run_with_transports(
        &self,
        transports: Vec<Box<dyn Transport>>,
        registration: Registration,
        shutdown: CancellationToken,
    ) -> AgentResult<()> {
        let connection = transports
            .into_iter()
            .fold(self.connection(registration)?, |c, t| c.with_transport(t));
        self.drive(connection, shutdown).await
    }

    fn connection(&self, registration: Registration) -> AgentResult<PendingConnection> {
        let outbound = self
            .inner
            .outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(AgentError::AlreadyRunning)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connection = CloudConnection::new(
            self.inner.config.transport.clone(),
            registration,
            self.inner.session.clone(),
            outbound,
            events_tx,
        );
        Ok(PendingConnection {
            connection,
            events: events_rx,
        })
    }

    async fn drive(
        &self,
        pending: PendingConnection,
        shutdown: CancellationToken,
    ) -> AgentResult<()> {
        let PendingConnection {
            connection,
            events: mut connection_events,
        } = pending;
        let tasks = shutdown.child_token();
        let (trigger_tx, mut triggers) = mpsc::unbounded_channel();

        let connection_task = tokio::spawn(connection.run(tasks.clone()));
        let scheduler = Scheduler::new(
            self.inner.config.scheduler.clone(),
            self.inner.session.clone(),
            trigger_tx.clone(),
        );
        let scheduler_task = tokio::spawn(scheduler.run(tasks.clone()));

        let mut state_changes = self.inner.session.subscribe();
        let mut syncs = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(event) = connection_events.recv() => {
                    self.on_connection_event(event, &trigger_tx).await;
                }
                Some(trigger) = triggers.recv() => {
                    let agent = self.clone();
                    syncs.spawn(async move {
                        // Errors are logged and reported inside
                        let _ = agent.trigger_sync(trigger).await;
                    });
                }
                Ok(()) = state_changes.changed() => {
                    let state = *state_changes.borrow_and_update();
                    self.emit(AgentEvent::ConnectionStateChanged { state });
                }
                Some(_) = syncs.join_next(), if !syncs.is_empty() => {}
            }
        }

        tasks.cancel();
        if !syncs.is_empty() {
            tracing::info!("aborting running sync");
            syncs.abort_all();
        }
        let _ = connection_task.await;
        let _ = scheduler_task.await;
        tracing::info!("agent stopped");
        Ok(())
    }

    async fn on_connection_event(
        &self,
        event: ConnectionEvent,
        triggers: &mpsc::UnboundedSender<SyncTrigger>,
    ) {
        match event {
            ConnectionEvent::Connected { .. } => {
                self.inner.state.update(|s| s.is_online = true).await;
            }
            ConnectionEvent::Registered(player) => {
                self.inner
                    .state
                    .update(|s| {
                        s.player_id = Some(player.id.clone());
                        s.is_online = true;
                    })
                    .await;
                let _ = triggers.send(SyncTrigger::Registered);
            }
            ConnectionEvent::DeployRequested(_) => {
                let _ = triggers.send(SyncTrigger::Deploy);
            }
            ConnectionEvent::Disconnected { .. } => {
                self.inner.state.update(|s| s.is_online = false).await;
            }
        }
    }

    fn emit(&self, event: AgentEvent) {
        self.inner.dispatcher.dispatch(event.clone());
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

/// Connection built by `connection()` but not yet spawned.
struct PendingConnection {
    connection: CloudConnection,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl PendingConnection {
    fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.connection = self.connection.with_transport(transport);
        self
    }

    fn with_default_transports(mut self) -> Self {
        self.connection = self.connection.with_default_transports();
        self
    }
}
