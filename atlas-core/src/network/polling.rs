// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Long-Polling Transport
//!
//! Fallback for networks that block WebSocket upgrades. Speaks Engine.IO's
//! polling transport:
//!
//! - `GET {path}?EIO=4&transport=polling` returns the open packet with the sid
//! - `POST ...&sid=<sid>` carries outbound packets, answered with `ok`
//! - `GET ...&sid=<sid>` holds until the server has packets; the server
//!   sends a ping at least every `pingInterval`
//! - `400` means the server no longer knows the sid
//!
//! A background task runs the GET loop, answers pings and feeds a channel,
//! so `receive` stays cancel-safe.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use super::engineio::{decode_payload, encode_payload, engine_url, EnginePacket, EngineTransport};
use super::error::NetworkError;
use super::message::{InboundEvent, OutboundEvent};
use super::socketio::SocketPacket;
use super::transport::{Transport, TransportConfig, TransportResult};

const INBOUND_BUFFER: usize = 32;
/// Slack on top of the liveness window before a poll counts as failed.
const POLL_GRACE: Duration = Duration::from_secs(5);

/// Everything needed to talk to one open Engine.IO session.
#[derive(Clone)]
struct Endpoint {
    client: Client,
    url: Url,
    token: String,
}

impl Endpoint {
    async fn post(&self, packets: &[EnginePacket], timeout: Duration) -> TransportResult<()> {
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(encode_payload(packets))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| NetworkError::SendFailed(e.to_string()))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => Err(NetworkError::ConnectionClosed),
            s => Err(NetworkError::SendFailed(format!("HTTP {}", s.as_u16()))),
        }
    }
}

struct PollSession {
    endpoint: Endpoint,
    io_timeout: Duration,
    inbound: mpsc::Receiver<TransportResult<SocketPacket>>,
    poller: JoinHandle<()>,
}

impl Drop for PollSession {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

impl PollSession {
    /// Waits for the namespace connect ack delivered by the poll loop.
    async fn await_connect_ack(&mut self) -> TransportResult<()> {
        loop {
            match self.inbound.recv().await {
                Some(Ok(SocketPacket::Connect(_))) => return Ok(()),
                Some(Ok(SocketPacket::ConnectError(message))) => {
                    return Err(NetworkError::ConnectionFailed(format!(
                        "namespace connect refused: {}",
                        message
                    )))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(NetworkError::ConnectionFailed(e.to_string())),
                None => return Err(NetworkError::ConnectionClosed),
            }
        }
    }
}

/// HTTP long-polling transport for the control channel.
#[derive(Default)]
pub struct PollingTransport {
    session: Option<PollSession>,
}

impl PollingTransport {
    /// Creates a new, unconnected polling transport.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for PollingTransport {
    fn kind(&self) -> &'static str {
        "polling"
    }

    async fn connect(&mut self, config: &TransportConfig) -> TransportResult<()> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        let open_url = engine_url(config, EngineTransport::Polling, None)?;

        let response = client
            .get(open_url)
            .bearer_auth(&config.device_token)
            .timeout(config.io_timeout)
            .send()
            .await
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NetworkError::ConnectionFailed(format!(
                "polling handshake returned HTTP {}",
                response.status().as_u16()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        let handshake = match decode_payload(&body)?.into_iter().next() {
            Some(EnginePacket::Open(handshake)) => handshake,
            other => {
                return Err(NetworkError::ConnectionFailed(format!(
                    "expected open packet, got {:?}",
                    other
                )))
            }
        };

        let endpoint = Endpoint {
            client,
            url: engine_url(config, EngineTransport::Polling, Some(&handshake.sid))?,
            token: config.device_token.clone(),
        };
        endpoint
            .post(
                &[EnginePacket::Message(SocketPacket::Connect(None).encode())],
                config.io_timeout,
            )
            .await
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        let (tx, inbound) = mpsc::channel(INBOUND_BUFFER);
        let poller = tokio::spawn(poll_loop(
            endpoint.clone(),
            handshake.liveness_window() + POLL_GRACE,
            config.io_timeout,
            tx,
        ));
        let mut session = PollSession {
            endpoint,
            io_timeout: config.io_timeout,
            inbound,
            poller,
        };
        session.await_connect_ack().await?;

        tracing::debug!(sid = %handshake.sid, "polling session opened");
        self.session = Some(session);
        Ok(())
    }

    async fn disconnect(&mut self) -> TransportResult<()> {
        if let Some(session) = self.session.take() {
            // Server expires abandoned sessions anyway
            let _ = session
                .endpoint
                .post(
                    &[
                        EnginePacket::Message(SocketPacket::Disconnect.encode()),
                        EnginePacket::Close,
                    ],
                    session.io_timeout,
                )
                .await;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn send(&mut self, event: &OutboundEvent) -> TransportResult<()> {
        let session = self.session.as_ref().ok_or(NetworkError::NotConnected)?;
        let packet = EnginePacket::Message(event.to_packet()?.encode());
        let result = session.endpoint.post(&[packet], session.io_timeout).await;
        if matches!(result, Err(NetworkError::ConnectionClosed)) {
            self.session = None;
        }
        result
    }

    async fn receive(&mut self) -> TransportResult<InboundEvent> {
        let session = self.session.as_mut().ok_or(NetworkError::NotConnected)?;
        let result = loop {
            match session.inbound.recv().await {
                Some(Ok(SocketPacket::Event { name, data })) => {
                    return InboundEvent::from_event(name, data)
                }
                Some(Ok(SocketPacket::Disconnect)) => break NetworkError::ConnectionClosed,
                Some(Ok(_)) => continue,
                Some(Err(NetworkError::InvalidMessage(m))) => {
                    return Err(NetworkError::InvalidMessage(m))
                }
                Some(Err(e)) => break e,
                None => break NetworkError::ConnectionClosed,
            }
        };
        self.session = None;
        Err(result)
    }
}

async fn poll_loop(
    endpoint: Endpoint,
    poll_timeout: Duration,
    io_timeout: Duration,
    tx: mpsc::Sender<TransportResult<SocketPacket>>,
) {
    loop {
        let result = endpoint
            .client
            .get(endpoint.url.clone())
            .bearer_auth(&endpoint.token)
            .timeout(poll_timeout)
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            // The server pings well inside the window, so silence means dead
            Err(e) if e.is_timeout() => {
                let _ = tx.send(Err(NetworkError::Timeout)).await;
                return;
            }
            Err(e) => {
                let _ = tx.send(Err(NetworkError::ReceiveFailed(e.to_string()))).await;
                return;
            }
        };

        match response.status() {
            StatusCode::OK => {}
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                let _ = tx.send(Err(NetworkError::ConnectionClosed)).await;
                return;
            }
            s => {
                let _ = tx
                    .send(Err(NetworkError::ReceiveFailed(format!("HTTP {}", s.as_u16()))))
                    .await;
                return;
            }
        }

        let body = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                let _ = tx.send(Err(NetworkError::ReceiveFailed(e.to_string()))).await;
                return;
            }
        };

        let packets = match decode_payload(&body) {
            Ok(packets) => packets,
            Err(e) => {
                if tx.send(Err(e)).await.is_err() {
                    return;
                }
                continue;
            }
        };
        for packet in packets {
            let item = match packet {
                EnginePacket::Ping => {
                    if let Err(e) = endpoint.post(&[EnginePacket::Pong], io_timeout).await {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                    continue;
                }
                EnginePacket::Message(data) => SocketPacket::decode(&data),
                EnginePacket::Close => {
                    let _ = tx.send(Err(NetworkError::ConnectionClosed)).await;
                    return;
                }
                _ => continue,
            };
            if tx.send(item).await.is_err() {
                return;
            }
        }
    }
}
