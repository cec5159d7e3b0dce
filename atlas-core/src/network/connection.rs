// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cloud Connection
//!
//! Owns the control channel lifecycle:
//! - Connects with the first transport that works (WebSocket, then polling)
//! - Registers the device on every connect
//! - Reconnects forever with capped exponential backoff
//! - Turns inbound events into [`ConnectionEvent`]s for the agent
//!
//! The [`Session`] is the shared view of the connection: state, assigned
//! player id and a best-effort outbound queue. It replaces process-wide
//! connection globals, so several agents can live in one process.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::error::NetworkError;
use super::message::{InboundEvent, OutboundEvent, PlayerInfo, Registration};
use super::polling::PollingTransport;
use super::transport::{ConnectionState, Transport, TransportConfig};
use super::websocket::WebSocketTransport;

const OUTBOUND_BUFFER: usize = 64;

/// What the connection reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// A transport opened.
    Connected { transport: &'static str },
    /// The cloud acknowledged registration.
    Registered(PlayerInfo),
    /// The cloud deployed a new playlist.
    DeployRequested(Value),
    /// The transport closed or failed.
    Disconnected { reason: String },
}

/// Receiving half of the session's outbound queue, consumed by the
/// connection loop.
#[derive(Debug)]
pub struct OutboundQueue(pub(crate) mpsc::Receiver<OutboundEvent>);

/// Shared connection state.
#[derive(Debug)]
pub struct Session {
    state: watch::Sender<ConnectionState>,
    player_id: Mutex<Option<String>>,
    outbound: mpsc::Sender<OutboundEvent>,
}

impl Session {
    /// Creates a disconnected session and its outbound queue.
    pub fn new(player_id: Option<String>) -> (Arc<Session>, OutboundQueue) {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (outbound, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let session = Session {
            state,
            player_id: Mutex::new(player_id),
            outbound,
        };
        (Arc::new(session), OutboundQueue(rx))
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn is_registered(&self) -> bool {
        self.state() == ConnectionState::Registered
    }

    /// Player id assigned by the cloud, or restored from persisted state.
    pub fn player_id(&self) -> Option<String> {
        self.player_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_player_id(&self, id: Option<String>) {
        *self.player_id.lock().unwrap_or_else(|e| e.into_inner()) = id;
    }

    /// Queues an event if connected. Returns false if it was dropped.
    ///
    /// Never blocks and never fails: reporting is best-effort.
    pub fn send(&self, event: OutboundEvent) -> bool {
        if !self.is_connected() {
            tracing::debug!(event = event.name(), "not connected, dropping event");
            return false;
        }
        match self.outbound.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "outbound queue unavailable, dropping event");
                false
            }
        }
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(?previous, ?state, "connection state changed");
        }
    }
}

/// Persistent connection to the cloud control channel.
pub struct CloudConnection {
    transports: Vec<Box<dyn Transport>>,
    config: TransportConfig,
    registration: Registration,
    session: Arc<Session>,
    outbound: OutboundQueue,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

impl CloudConnection {
    /// Creates a connection without transports. Add them in preference
    /// order with [`with_transport`](Self::with_transport).
    pub fn new(
        config: TransportConfig,
        registration: Registration,
        session: Arc<Session>,
        outbound: OutboundQueue,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Self {
        CloudConnection {
            transports: Vec::new(),
            config,
            registration,
            session,
            outbound,
            events,
        }
    }

    /// Adds a transport after those already registered.
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Adds the production transports: WebSocket first, polling fallback.
    pub fn with_default_transports(self) -> Self {
        self.with_transport(Box::new(WebSocketTransport::new()))
            .with_transport(Box::new(PollingTransport::new()))
    }

    /// Runs until `shutdown` is cancelled, reconnecting as needed.
    pub async fn run(mut self, shutdown: CancellationToken) {
        if self.transports.is_empty() {
            tracing::error!("no transports configured, cloud connection disabled");
            return;
        }

        let mut backoff = self.config.backoff();
        while !shutdown.is_cancelled() {
            self.session.set_state(ConnectionState::Connecting);
            match self.connect_any(&shutdown).await {
                Some(index) => {
                    backoff.reset();
                    let reason = self.serve(index, &shutdown).await;
                    // Close errors don't matter once the session is over
                    let _ = self.transports[index].disconnect().await;
                    self.session.set_state(ConnectionState::Disconnected);
                    tracing::info!(reason = %reason, "disconnected from cloud");
                    self.emit(ConnectionEvent::Disconnected { reason });
                }
                None => self.session.set_state(ConnectionState::Disconnected),
            }

            if shutdown.is_cancelled() {
                break;
            }
            let delay = backoff.next_delay();
            tracing::debug!(
                attempt = backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "waiting before reconnect"
            );
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        self.session.set_state(ConnectionState::Disconnected);
        tracing::debug!("cloud connection stopped");
    }

    /// Tries every transport in order. Returns the index of the one that
    /// connected and accepted the registration request.
    async fn connect_any(&mut self, shutdown: &CancellationToken) -> Option<usize> {
        for index in 0..self.transports.len() {
            let kind = self.transports[index].kind();
            let attempt = tokio::time::timeout(
                self.config.connect_timeout,
                self.transports[index].connect(&self.config),
            );
            let result = tokio::select! {
                _ = shutdown.cancelled() => return None,
                r = attempt => r.unwrap_or(Err(NetworkError::Timeout)),
            };
            if let Err(e) = result {
                tracing::warn!(transport = kind, error = %e, "connect failed");
                continue;
            }

            self.session.set_state(ConnectionState::Connected);
            tracing::info!(transport = kind, "connected to cloud");
            self.emit(ConnectionEvent::Connected { transport: kind });

            // Reports queued for an earlier session are out of date
            while self.outbound.0.try_recv().is_ok() {}

            let register = OutboundEvent::Register(self.registration.clone());
            if let Err(e) = self.transports[index].send(&register).await {
                tracing::warn!(transport = kind, error = %e, "registration send failed");
                let _ = self.transports[index].disconnect().await;
                self.session.set_state(ConnectionState::Disconnected);
                self.emit(ConnectionEvent::Disconnected {
                    reason: e.to_string(),
                });
                continue;
            }
            tracing::debug!(name = %self.registration.name, "registration sent");
            return Some(index);
        }
        None
    }

    /// Pumps events until the transport fails or shutdown. Returns the
    /// disconnect reason.
    async fn serve(&mut self, index: usize, shutdown: &CancellationToken) -> String {
        let transport = &mut self.transports[index];
        let outbound = &mut self.outbound.0;
        let session = &self.session;
        let events = &self.events;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return "client shutdown".to_string(),
                Some(event) = outbound.recv() => {
                    if let Err(e) = transport.send(&event).await {
                        return e.to_string();
                    }
                }
                inbound = transport.receive() => match inbound {
                    Ok(event) => handle_inbound(session, events, event),
                    Err(NetworkError::InvalidMessage(m)) => {
                        tracing::warn!(error = %m, "ignoring undecodable frame");
                    }
                    Err(e) => return e.to_string(),
                },
            }
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        // Owner may have stopped listening during shutdown
        let _ = self.events.send(event);
    }
}

fn handle_inbound(
    session: &Session,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
    event: InboundEvent,
) {
    match event {
        InboundEvent::Registered(info) => {
            tracing::info!(player_id = %info.id, name = ?info.name, "registered with cloud");
            session.set_player_id(Some(info.id.clone()));
            session.set_state(ConnectionState::Registered);
            let _ = events.send(ConnectionEvent::Registered(info));
        }
        InboundEvent::DeployPlaylist(data) => {
            tracing::info!("playlist deployed");
            let _ = events.send(ConnectionEvent::DeployRequested(data));
        }
        InboundEvent::Other { event } => {
            tracing::debug!(event = %event, "ignoring unhandled event");
        }
    }
}
