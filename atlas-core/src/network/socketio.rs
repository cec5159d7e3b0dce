// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Socket.IO Packets
//!
//! Socket.IO v5 packets ride inside Engine.IO message packets. The agent
//! only talks on the default namespace, so `40` connects, `41` disconnects
//! and `42["name",data]` carries an event. Packets addressed to another
//! namespace decode as [`SocketPacket::Other`].

use serde_json::Value;

use super::error::NetworkError;

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Namespace connect. The client sends it bare, the server answers
    /// with `{"sid": ...}`.
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, data: Value },
    /// The server refused the namespace connect.
    ConnectError(String),
    /// Acks, binary packets and foreign namespaces.
    Other { kind: char },
}

impl SocketPacket {
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        SocketPacket::Event {
            name: name.into(),
            data,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(payload)) => format!("0{}", payload),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, data } => {
                format!("2{}", serde_json::json!([name, data]))
            }
            SocketPacket::ConnectError(message) => {
                format!("4{}", serde_json::json!({ "message": message }))
            }
            SocketPacket::Other { kind } => kind.to_string(),
        }
    }

    pub fn decode(text: &str) -> Result<Self, NetworkError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| NetworkError::InvalidMessage("empty socket packet".into()))?;
        let mut rest = chars.as_str();

        if rest.starts_with('/') {
            let (namespace, tail) = rest.split_once(',').unwrap_or((rest, ""));
            if namespace != "/" {
                return Ok(SocketPacket::Other { kind });
            }
            rest = tail;
        }

        match kind {
            '0' => Ok(SocketPacket::Connect(parse_optional(rest)?)),
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                // Skip the ack id, the agent never answers acks
                let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
                let args: Vec<Value> = serde_json::from_str(rest)?;
                let mut args = args.into_iter();
                let name = match args.next() {
                    Some(Value::String(name)) => name,
                    _ => {
                        return Err(NetworkError::InvalidMessage(
                            "event without a name".into(),
                        ))
                    }
                };
                Ok(SocketPacket::Event {
                    name,
                    data: args.next().unwrap_or(Value::Null),
                })
            }
            '4' => {
                let message = match parse_optional(rest)? {
                    Some(payload) => payload
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| payload.to_string()),
                    None => String::new(),
                };
                Ok(SocketPacket::ConnectError(message))
            }
            '3' | '5' | '6' => Ok(SocketPacket::Other { kind }),
            other => Err(NetworkError::InvalidMessage(format!(
                "unknown socket packet type {:?}",
                other
            ))),
        }
    }
}

fn parse_optional(text: &str) -> Result<Option<Value>, NetworkError> {
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::from_str(text)?))
    }
}
