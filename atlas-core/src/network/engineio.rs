// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Engine.IO v4 Framing
//!
//! The layer underneath Socket.IO. A packet is a single type digit followed
//! by an optional text payload:
//!
//! | Type | Packet  | Sent by |
//! |------|---------|---------|
//! | `0`  | open    | server, carries the handshake JSON |
//! | `1`  | close   | either  |
//! | `2`  | ping    | server  |
//! | `3`  | pong    | client  |
//! | `4`  | message | either, carries one Socket.IO packet |
//! | `5`  | upgrade | client  |
//! | `6`  | noop    | server  |
//!
//! Over WebSocket every text frame holds one packet. A polling body holds
//! several, separated by the `0x1e` record separator.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::error::NetworkError;
use super::transport::{TransportConfig, TransportResult};

/// Engine.IO protocol revision sent as the `EIO` query parameter.
pub const PROTOCOL_VERSION: &str = "4";

const RECORD_SEPARATOR: char = '\u{1e}';

/// Session parameters from the server's open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// How long the server may stay silent before the session counts as dead.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(h) => {
                let body = serde_json::json!({
                    "sid": h.sid,
                    "upgrades": h.upgrades,
                    "pingInterval": h.ping_interval,
                    "pingTimeout": h.ping_timeout,
                    "maxPayload": h.max_payload,
                });
                format!("0{}", body)
            }
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping => "2".to_string(),
            EnginePacket::Pong => "3".to_string(),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }

    pub fn decode(text: &str) -> Result<Self, NetworkError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| NetworkError::InvalidMessage("empty engine packet".into()))?;
        let rest = chars.as_str();
        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(rest)?)),
            '1' => Ok(EnginePacket::Close),
            // Ping and pong may carry a payload during upgrades; it's unused here
            '2' => Ok(EnginePacket::Ping),
            '3' => Ok(EnginePacket::Pong),
            '4' => Ok(EnginePacket::Message(rest.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(NetworkError::InvalidMessage(format!(
                "unknown engine packet type {:?}",
                other
            ))),
        }
    }
}

/// Joins packets into one polling body.
pub fn encode_payload(packets: &[EnginePacket]) -> String {
    let encoded: Vec<String> = packets.iter().map(EnginePacket::encode).collect();
    encoded.join(&RECORD_SEPARATOR.to_string())
}

/// Splits a polling body into its packets.
pub fn decode_payload(body: &str) -> Result<Vec<EnginePacket>, NetworkError> {
    body.split(RECORD_SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(EnginePacket::decode)
        .collect()
}

/// Which Engine.IO transport an endpoint URL is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineTransport {
    WebSocket,
    Polling,
}

impl EngineTransport {
    fn query_value(self) -> &'static str {
        match self {
            EngineTransport::WebSocket => "websocket",
            EngineTransport::Polling => "polling",
        }
    }
}

/// Builds the Engine.IO endpoint for `transport`.
///
/// `https://cloud.example.com` becomes
/// `wss://cloud.example.com/socket.io/?EIO=4&transport=websocket` for
/// WebSocket and keeps its http(s) scheme for polling. `sid` is appended
/// once a polling session is open.
pub fn engine_url(
    config: &TransportConfig,
    transport: EngineTransport,
    sid: Option<&str>,
) -> TransportResult<Url> {
    let mut url = Url::parse(&config.server_url)
        .map_err(|e| NetworkError::ConnectionFailed(format!("invalid server URL: {}", e)))?;
    let secure = match url.scheme() {
        "https" | "wss" => true,
        "http" | "ws" => false,
        other => {
            return Err(NetworkError::ConnectionFailed(format!(
                "unsupported URL scheme: {}",
                other
            )))
        }
    };
    let scheme = match (transport, secure) {
        (EngineTransport::WebSocket, true) => "wss",
        (EngineTransport::WebSocket, false) => "ws",
        (EngineTransport::Polling, true) => "https",
        (EngineTransport::Polling, false) => "http",
    };
    url.set_scheme(scheme)
        .map_err(|_| NetworkError::ConnectionFailed("cannot derive endpoint URL".into()))?;

    let path = format!(
        "{}/{}/",
        url.path().trim_end_matches('/'),
        config.path.trim_matches('/')
    );
    url.set_path(&path);
    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("EIO", PROTOCOL_VERSION)
            .append_pair("transport", transport.query_value());
        if let Some(sid) = sid {
            query.append_pair("sid", sid);
        }
    }
    Ok(url)
}
