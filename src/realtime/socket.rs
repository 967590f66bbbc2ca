//! Socket.IO websocket connection for the chat channel

use std::collections::VecDeque;
use std::future::Future;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::events::{ClientEvent, ServerEvent};
use super::frame::{self, Frame};
use crate::api::ApiError;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Bidirectional chat event channel.
///
/// `next_event` must be cancel-safe: the sync loop polls it inside
/// `tokio::select!` next to its timers and drops it when another branch wins.
pub trait EventChannel: Send {
    fn emit(&mut self, event: &ClientEvent) -> impl Future<Output = Result<()>> + Send;

    /// Next decoded server event, `None` once the connection is gone.
    fn next_event(&mut self) -> impl Future<Output = Result<Option<ServerEvent>>> + Send;
}

/// Websocket endpoint for an http(s) or ws(s) base URL.
pub fn socket_endpoint(base: &str) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("Invalid socket URL: {}", base))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => anyhow::bail!("Unsupported socket URL scheme: {}", other),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("Cannot use scheme {} for {}", scheme, base))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

pub struct ChatSocket {
    stream: WsStream,
    endpoint: String,
    /// Pongs owed to the server, sent before the next read or emit.
    pongs: VecDeque<Message>,
}

impl ChatSocket {
    /// Open the websocket, wait for the Engine.IO handshake and join the
    /// default namespace with the bearer token as auth payload.
    pub async fn connect(base: &str, token: &str) -> Result<Self> {
        let url = socket_endpoint(base)?;
        tracing::info!("Connecting chat socket to {}", url);

        let (stream, response) = connect_async(url.as_str())
            .await
            .context("WebSocket connection failed")?;
        tracing::debug!("WebSocket connected (status={})", response.status());

        let mut socket = Self {
            stream,
            endpoint: url.to_string(),
            pongs: VecDeque::new(),
        };

        match socket.recv_frame().await? {
            Some(Frame::Open(handshake)) => tracing::debug!(
                "Engine.IO open: sid={} ping={}ms",
                handshake.sid,
                handshake.ping_interval
            ),
            Some(other) => anyhow::bail!("Expected Engine.IO open packet, got {:?}", other),
            None => anyhow::bail!("Connection closed before handshake"),
        }

        socket
            .send_text(frame::encode_connect(Some(&json!({ "token": token }))))
            .await?;

        loop {
            match socket.recv_frame().await? {
                Some(Frame::Connect(_)) => break,
                Some(Frame::ConnectError(data)) => return Err(socket.refused(&data)),
                Some(other) => tracing::debug!("Ignoring frame before connect: {:?}", other),
                None => anyhow::bail!("Connection closed before namespace connect"),
            }
        }

        tracing::info!("Chat socket connected");
        Ok(socket)
    }

    /// Map a namespace connect refusal; token problems become session expiry.
    fn refused(&self, data: &serde_json::Value) -> anyhow::Error {
        let message = data
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string());
        let lower = message.to_lowercase();
        if ["expired", "unauthorized", "jwt", "token"]
            .iter()
            .any(|k| lower.contains(k))
        {
            ApiError::SessionExpired {
                url: self.endpoint.clone(),
            }
            .into()
        } else {
            anyhow::anyhow!("Chat server refused the connection: {}", message)
        }
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        tracing::trace!("WS send: {}", text);
        self.stream
            .send(Message::Text(text))
            .await
            .context("Failed to send WebSocket message")
    }

    /// Send owed pongs. Each stays queued until its send completes, so a
    /// cancelled flush is retried rather than lost.
    async fn flush_pongs(&mut self) -> Result<()> {
        while let Some(pong) = self.pongs.front().cloned() {
            self.stream
                .send(pong)
                .await
                .context("Failed to send pong")?;
            self.pongs.pop_front();
        }
        Ok(())
    }

    /// Receive the next Socket.IO-level frame.
    ///
    /// Pings are answered and never surface. Frames that do not parse are
    /// logged and skipped. Cancel-safe: nothing is awaited between taking a
    /// message off the stream and queueing or returning its result.
    async fn recv_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            self.flush_pongs().await?;

            let text = match self.stream.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Ping(data))) => {
                    self.pongs.push_back(Message::Pong(data));
                    continue;
                }
                Some(Ok(Message::Close(close))) => {
                    tracing::info!("WebSocket closed: {:?}", close);
                    return Ok(None);
                }
                Some(Ok(other)) => {
                    tracing::debug!("WS frame (ignored): {:?}", other);
                    continue;
                }
                Some(Err(e)) => return Err(e).context("WebSocket receive error"),
                None => return Ok(None),
            };

            tracing::trace!("WS recv: {}", text);
            match frame::parse(&text) {
                Ok(Frame::Ping) => self.pongs.push_back(Message::Text(frame::PONG.to_string())),
                Ok(Frame::Close) => return Ok(None),
                Ok(parsed) => return Ok(Some(parsed)),
                Err(e) => tracing::warn!("Unparseable frame {:?}: {}", text, e),
            }
        }
    }

    pub async fn close(mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("WebSocket close failed: {}", e);
        }
    }
}

impl EventChannel for ChatSocket {
    async fn emit(&mut self, event: &ClientEvent) -> Result<()> {
        tracing::debug!("emit {}", event.name());
        self.flush_pongs().await?;
        self.send_text(event.encode()).await
    }

    async fn next_event(&mut self) -> Result<Option<ServerEvent>> {
        loop {
            match self.recv_frame().await? {
                Some(Frame::Event { name, data }) => match ServerEvent::decode(&name, data) {
                    Ok(Some(event)) => return Ok(Some(event)),
                    Ok(None) => tracing::debug!("Unhandled event: {}", name),
                    Err(e) => tracing::warn!("Malformed {} payload: {}", name, e),
                },
                Some(Frame::Disconnect) => {
                    tracing::info!("Server disconnected the namespace");
                    return Ok(None);
                }
                Some(other) => tracing::trace!("Frame (ignored): {:?}", other),
                None => return Ok(None),
            }
        }
    }
}
