// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Heartbeat and Poll Scheduler
//!
//! Time-driven triggers that run beside the cloud connection:
//! - heartbeat: liveness ping, only while connected
//! - poll: sync request, only while registered; covers missed pushes
//! - startup: one sync shortly after start when a player id is already known

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::network::{OutboundEvent, Session};

/// Why a sync cycle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Cloud acknowledged registration
    Registered,
    /// Cloud deployed a new playlist
    Deploy,
    /// Periodic poll
    Poll,
    /// Delayed sync after start
    Startup,
    /// Requested by a caller
    Manual,
}

/// Scheduler intervals.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub heartbeat_interval: Duration,
    pub poll_interval: Duration,
    pub initial_sync_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            heartbeat_interval: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5 * 60),
            initial_sync_delay: Duration::from_secs(5),
        }
    }
}

/// Periodic heartbeat and poll timers bound to a session.
pub struct Scheduler {
    config: SchedulerConfig,
    session: Arc<Session>,
    triggers: mpsc::UnboundedSender<SyncTrigger>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        session: Arc<Session>,
        triggers: mpsc::UnboundedSender<SyncTrigger>,
    ) -> Self {
        Scheduler {
            config,
            session,
            triggers,
        }
    }

    /// Runs the timers until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let start = Instant::now();
        let mut heartbeat = time::interval_at(
            start + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut poll = time::interval_at(start + self.config.poll_interval, self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let startup = time::sleep(self.config.initial_sync_delay);
        tokio::pin!(startup);
        let mut startup_pending = self.session.player_id().is_some();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = &mut startup, if startup_pending => {
                    startup_pending = false;
                    tracing::debug!("startup sync");
                    self.trigger(SyncTrigger::Startup);
                }
                _ = heartbeat.tick() => {
                    if self.session.is_connected() {
                        self.session.send(OutboundEvent::Heartbeat { timestamp: Utc::now() });
                    }
                }
                _ = poll.tick() => {
                    if self.session.is_registered() && self.session.player_id().is_some() {
                        tracing::debug!("poll sync");
                        self.trigger(SyncTrigger::Poll);
                    }
                }
            }
        }
        tracing::debug!("scheduler stopped");
    }

    fn trigger(&self, trigger: SyncTrigger) {
        // Receiver is gone only during shutdown
        let _ = self.triggers.send(trigger);
    }
}
