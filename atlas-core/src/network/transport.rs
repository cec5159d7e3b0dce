// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Trait
//!
//! Abstraction over the bidirectional channel to the cloud, plus the
//! reconnection backoff shared by every transport.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use super::error::NetworkError;
use super::message::{InboundEvent, OutboundEvent};

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, NetworkError>;

/// Connection state as seen by the rest of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to the cloud.
    Disconnected,
    /// Connect in progress.
    Connecting,
    /// Transport open, registration not yet acknowledged.
    Connected,
    /// Cloud acknowledged registration and assigned a player id.
    Registered,
}

impl ConnectionState {
    /// True once a transport is open, registered or not.
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Registered)
    }
}

/// Configuration for transport connections.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Cloud base URL (http or https).
    pub server_url: String,
    /// Bearer token presented on connect.
    pub device_token: String,
    /// Socket.IO endpoint path, shared by both transports.
    pub path: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read/write timeout.
    pub io_timeout: Duration,
    /// First reconnection delay.
    pub reconnect_delay: Duration,
    /// Upper bound for reconnection delays.
    pub reconnect_delay_max: Duration,
    /// Random spread applied to each delay, 0.0 to 1.0.
    pub randomization_factor: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            server_url: crate::cache::DEFAULT_SERVER_URL.to_string(),
            device_token: "system".to_string(),
            path: "/socket.io/".to_string(),
            connect_timeout: Duration::from_secs(10),
            io_timeout: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(1),
            reconnect_delay_max: Duration::from_secs(30),
            randomization_factor: 0.5,
        }
    }
}

impl TransportConfig {
    /// Creates a config for the given cloud base URL.
    pub fn with_server_url(mut self, url: &str) -> Self {
        self.server_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Sets the bearer token.
    pub fn with_device_token(mut self, token: impl Into<String>) -> Self {
        self.device_token = token.into();
        self
    }

    /// Backoff policy described by this config.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.reconnect_delay, self.reconnect_delay_max)
            .with_randomization(self.randomization_factor)
    }
}

/// Capped exponential backoff with jitter.
///
/// Delay for attempt `n` is `initial * 2^n`, spread by the randomization
/// factor and never above `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    randomization: f64,
    attempt: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Backoff {
            initial,
            max,
            randomization: 0.0,
            attempt: 0,
        }
    }

    pub fn with_randomization(mut self, factor: f64) -> Self {
        self.randomization = factor.clamp(0.0, 1.0);
        self
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the next delay and advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let base = self
            .initial
            .saturating_mul(1 << self.attempt.min(16))
            .min(self.max);
        self.attempt = self.attempt.saturating_add(1);

        if self.randomization == 0.0 {
            return base;
        }
        let spread = base.as_secs_f64() * self.randomization;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        let delay = (base.as_secs_f64() + offset).max(0.0);
        Duration::from_secs_f64(delay).min(self.max)
    }

    /// Start over from the initial delay. Called after a successful connect.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Bidirectional event channel to the cloud.
///
/// Implementations must keep `receive` cancel-safe: the connection loop
/// races it against outbound sends and shutdown, and a dropped `receive`
/// future must not lose an event.
#[async_trait]
pub trait Transport: Send {
    /// Short name used in logs.
    fn kind(&self) -> &'static str;

    /// Opens the channel.
    async fn connect(&mut self, config: &TransportConfig) -> TransportResult<()>;

    /// Closes the channel. Safe to call when not connected.
    async fn disconnect(&mut self) -> TransportResult<()>;

    /// Returns true while the channel is open.
    fn is_connected(&self) -> bool;

    /// Sends one event.
    async fn send(&mut self, event: &OutboundEvent) -> TransportResult<()>;

    /// Waits for the next inbound event.
    ///
    /// `Err(NetworkError::InvalidMessage)` reports an undecodable frame and
    /// leaves the channel usable; any other error means the channel is gone.
    async fn receive(&mut self) -> TransportResult<InboundEvent>;
}
