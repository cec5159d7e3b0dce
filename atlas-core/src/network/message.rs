// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Control Channel Messages
//!
//! Events travel as Socket.IO event packets, `42["register",{...}]` on the
//! wire. This module maps them to typed values; the framing lives in
//! `socketio` and `engineio`.
//!
//! Outbound (device → cloud): `register`, `heartbeat`, `sync_status`.
//! Inbound (cloud → device): `registered`, `deploy_playlist`. Any other
//! inbound event is surfaced as [`InboundEvent::Other`] and ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::error::NetworkError;
use super::socketio::SocketPacket;
use crate::cache::SyncOutcome;

/// Registration request sent right after the transport connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Board serial number
    #[serde(rename = "cpu_serial")]
    pub hardware_id: String,
    /// Identity assigned at enrollment
    #[serde(rename = "device_uuid")]
    pub device_id: String,
    /// Human-readable player name
    pub name: String,
}

/// Overall status carried by a `sync_status` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Every asset synced
    Complete,
    /// At least one asset failed
    Partial,
    /// The cycle aborted
    Error,
}

/// Result of a sync cycle as reported to the cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusReport {
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SyncStatusReport {
    /// Report for a cycle that ran to completion.
    pub fn from_outcome(outcome: &SyncOutcome, timestamp: DateTime<Utc>) -> Self {
        SyncStatusReport {
            status: if outcome.success {
                ReportStatus::Complete
            } else {
                ReportStatus::Partial
            },
            downloaded: Some(outcome.downloaded),
            failed: Some(outcome.failed),
            removed: Some(outcome.removed),
            error: None,
            timestamp,
        }
    }

    /// Report for an aborted cycle.
    pub fn from_error(error: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        SyncStatusReport {
            status: ReportStatus::Error,
            downloaded: None,
            failed: None,
            removed: None,
            error: Some(error.into()),
            timestamp,
        }
    }
}

/// Events the device sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    Register(Registration),
    Heartbeat { timestamp: DateTime<Utc> },
    SyncStatus(SyncStatusReport),
}

impl OutboundEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Register(_) => "register",
            OutboundEvent::Heartbeat { .. } => "heartbeat",
            OutboundEvent::SyncStatus(_) => "sync_status",
        }
    }

    /// Event payload.
    pub fn data(&self) -> Result<Value, NetworkError> {
        Ok(match self {
            OutboundEvent::Register(r) => serde_json::to_value(r)?,
            OutboundEvent::Heartbeat { timestamp } => {
                serde_json::json!({ "timestamp": timestamp })
            }
            OutboundEvent::SyncStatus(s) => serde_json::to_value(s)?,
        })
    }

    /// Socket.IO event packet carrying this event.
    pub fn to_packet(&self) -> Result<SocketPacket, NetworkError> {
        Ok(SocketPacket::event(self.name(), self.data()?))
    }
}

/// Player record returned by the cloud on registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Events the cloud pushes.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Registration acknowledged; carries the assigned player identity.
    Registered(PlayerInfo),
    /// New playlist deployed. Only its arrival matters.
    DeployPlaylist(Value),
    /// Any event the agent doesn't handle.
    Other { event: String },
}

impl InboundEvent {
    /// Maps a received Socket.IO event to a typed event.
    pub fn from_event(name: String, data: Value) -> Result<Self, NetworkError> {
        match name.as_str() {
            "registered" => Ok(InboundEvent::Registered(serde_json::from_value(data)?)),
            "deploy_playlist" => Ok(InboundEvent::DeployPlaylist(data)),
            _ => Ok(InboundEvent::Other { event: name }),
        }
    }

    /// Socket.IO event packet, the way the cloud sends it.
    pub fn to_packet(&self) -> Result<SocketPacket, NetworkError> {
        Ok(match self {
            InboundEvent::Registered(info) => {
                SocketPacket::event("registered", serde_json::to_value(info)?)
            }
            InboundEvent::DeployPlaylist(data) => SocketPacket::event("deploy_playlist", data.clone()),
            InboundEvent::Other { event } => SocketPacket::event(event.clone(), Value::Null),
        })
    }
}

/// Player ids arrive as strings or integers depending on the backend.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
