// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Message transport underneath the realtime channel.
//!
//! [`WebSocketTransport`] exchanges JSON text frames over tokio-tungstenite
//! and presents the access token as a bearer header on the upgrade
//! request. Tests plug in-process implementations of [`Transport`].

use std::future::Future;
use std::pin::Pin;

use roam_core::{InboundMessage, OutboundMessage};
use tracing::warn;

/// Failures of a single realtime connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The upgrade request was rejected or the host was unreachable.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No open connection.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// An outbound message could not be encoded.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// A bidirectional, message-framed connection to the realtime endpoint.
///
/// One transport instance carries one connection. The realtime channel
/// asks its factory for a fresh transport on every (re)connect attempt.
pub trait Transport: Send + Sync {
    /// Connect to `url`, authenticating with `token`.
    fn connect(&mut self, url: &str, token: &str) -> TransportFuture<'_, ()>;

    /// Close the connection. Closing twice is a no-op.
    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    /// Send one frame.
    fn send(&mut self, msg: OutboundMessage) -> TransportFuture<'_, ()>;

    /// Wait for the next inbound event.
    ///
    /// Returns `None` once the peer closes the connection.
    fn recv(&mut self) -> TransportFuture<'_, Option<InboundMessage>>;

    fn is_connected(&self) -> bool;
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Production transport over tokio-tungstenite.
pub struct WebSocketTransport {
    ws: Option<WebSocketConnection>,
}

struct WebSocketConnection {
    sink: futures_util::stream::SplitSink<WsStream, tokio_tungstenite::tungstenite::Message>,
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        WebSocketTransport { ws: None }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str, token: &str) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        let token = token.to_string();
        Box::pin(async move {
            use futures_util::StreamExt;
            use tokio_tungstenite::tungstenite::client::IntoClientRequest;
            use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
            use tokio_tungstenite::tungstenite::http::HeaderValue;

            let mut request = url
                .as_str()
                .into_client_request()
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, bearer);

            let (ws_stream, _) = tokio_tungstenite::connect_async(request)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let (sink, stream) = ws_stream.split();
            self.ws = Some(WebSocketConnection { sink, stream });
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut ws) = self.ws.take() {
                use futures_util::SinkExt;
                // Best effort: the peer may already be gone.
                let _ = ws.sink.close().await;
            }
            Ok(())
        })
    }

    fn send(&mut self, msg: OutboundMessage) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            use futures_util::SinkExt;
            use tokio_tungstenite::tungstenite::Message;

            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            let json = msg
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;

            if let Err(e) = ws.sink.send(Message::Text(json.into())).await {
                self.ws = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }

            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<InboundMessage>> {
        Box::pin(async move {
            use futures_util::StreamExt;
            use tokio_tungstenite::tungstenite::Message;

            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            loop {
                match ws.stream.next().await {
                    Some(Ok(Message::Text(text))) => match InboundMessage::from_json(&text) {
                        Ok(msg) => return Ok(Some(msg)),
                        Err(e) => {
                            // One bad frame must not drop the connection.
                            warn!(error = %e, "ignoring malformed realtime message");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        self.ws = None;
                        return Ok(None);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        self.ws = None;
                        return Err(TransportError::ReceiveFailed(e.to_string()));
                    }
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
