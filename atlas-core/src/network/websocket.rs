// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! WebSocket Transport
//!
//! Preferred transport: Engine.IO over a WebSocket, one packet per text
//! frame. Connecting reads the server's open packet, joins the default
//! Socket.IO namespace and waits for the server to acknowledge it.
//!
//! The server pings, the client answers. If nothing arrives within
//! `pingInterval + pingTimeout` the connection is treated as dead.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{self, Duration, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::engineio::{engine_url, EnginePacket, EngineTransport};
use super::error::NetworkError;
use super::message::{InboundEvent, OutboundEvent};
use super::socketio::SocketPacket;
use super::transport::{Transport, TransportConfig, TransportResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct WsConnection {
    stream: WsStream,
    liveness: Duration,
    deadline: Instant,
}

impl WsConnection {
    async fn send_packet(&mut self, packet: EnginePacket) -> TransportResult<()> {
        self.stream
            .send(Message::Text(packet.encode()))
            .await
            .map_err(|e| NetworkError::SendFailed(e.to_string()))
    }

    /// Next Engine.IO packet, or `Timeout` once the server went quiet.
    async fn next_packet(&mut self) -> TransportResult<EnginePacket> {
        let packet = match time::timeout_at(self.deadline, read_packet(&mut self.stream)).await {
            Ok(packet) => packet?,
            Err(_) => return Err(NetworkError::Timeout),
        };
        self.deadline = Instant::now() + self.liveness;
        Ok(packet)
    }

    /// Waits for the namespace connect ack, answering pings meanwhile.
    async fn await_connect_ack(&mut self) -> TransportResult<()> {
        loop {
            match self.next_packet().await? {
                EnginePacket::Ping => self.send_packet(EnginePacket::Pong).await?,
                EnginePacket::Message(data) => match SocketPacket::decode(&data)? {
                    SocketPacket::Connect(_) => return Ok(()),
                    SocketPacket::ConnectError(message) => {
                        return Err(NetworkError::ConnectionFailed(format!(
                            "namespace connect refused: {}",
                            message
                        )))
                    }
                    _ => continue,
                },
                EnginePacket::Close => return Err(NetworkError::ConnectionClosed),
                _ => continue,
            }
        }
    }

    async fn next_event(&mut self) -> TransportResult<InboundEvent> {
        loop {
            match self.next_packet().await? {
                EnginePacket::Ping => self.send_packet(EnginePacket::Pong).await?,
                EnginePacket::Message(data) => match SocketPacket::decode(&data)? {
                    SocketPacket::Event { name, data } => {
                        return InboundEvent::from_event(name, data)
                    }
                    SocketPacket::Disconnect => return Err(NetworkError::ConnectionClosed),
                    _ => continue,
                },
                EnginePacket::Close => return Err(NetworkError::ConnectionClosed),
                _ => continue,
            }
        }
    }
}

/// Reads frames until one holds an Engine.IO packet.
async fn read_packet(stream: &mut WsStream) -> TransportResult<EnginePacket> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return EnginePacket::decode(&text),
            // Binary attachments are never sent to players
            Some(Ok(Message::Binary(_))) => continue,
            // Pongs are queued by tungstenite itself
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Err(NetworkError::ConnectionClosed),
            Some(Err(e)) => return Err(NetworkError::ReceiveFailed(e.to_string())),
        }
    }
}

/// WebSocket transport for the control channel.
#[derive(Default)]
pub struct WebSocketTransport {
    conn: Option<WsConnection>,
}

impl WebSocketTransport {
    /// Creates a new, unconnected WebSocket transport.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn kind(&self) -> &'static str {
        "websocket"
    }

    async fn connect(&mut self, config: &TransportConfig) -> TransportResult<()> {
        let url = engine_url(config, EngineTransport::WebSocket, None)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        if !config.device_token.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", config.device_token))
                .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (mut stream, _response) = connect_async(request)
            .await
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        let handshake = match read_packet(&mut stream).await? {
            EnginePacket::Open(handshake) => handshake,
            other => {
                return Err(NetworkError::ConnectionFailed(format!(
                    "expected open packet, got {:?}",
                    other
                )))
            }
        };
        let liveness = handshake.liveness_window();
        let mut conn = WsConnection {
            stream,
            liveness,
            deadline: Instant::now() + liveness,
        };
        conn.send_packet(EnginePacket::Message(SocketPacket::Connect(None).encode()))
            .await?;
        conn.await_connect_ack().await?;

        tracing::debug!(url = %url, sid = %handshake.sid, "websocket connected");
        self.conn = Some(conn);
        Ok(())
    }

    async fn disconnect(&mut self) -> TransportResult<()> {
        if let Some(mut conn) = self.conn.take() {
            // Peer may already be gone
            let _ = conn
                .send_packet(EnginePacket::Message(SocketPacket::Disconnect.encode()))
                .await;
            let _ = conn.stream.close(None).await;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn send(&mut self, event: &OutboundEvent) -> TransportResult<()> {
        let conn = self.conn.as_mut().ok_or(NetworkError::NotConnected)?;
        let packet = EnginePacket::Message(event.to_packet()?.encode());
        conn.send_packet(packet).await
    }

    async fn receive(&mut self) -> TransportResult<InboundEvent> {
        let conn = self.conn.as_mut().ok_or(NetworkError::NotConnected)?;
        let result = conn.next_event().await;
        if let Err(e) = &result {
            if !matches!(e, NetworkError::InvalidMessage(_)) {
                self.conn = None;
            }
        }
        result
    }
}
