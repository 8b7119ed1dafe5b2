//! WebSocket Transport
//!
//! `tokio-tungstenite` implementation of the feed transport port.
//!
//! # Stream URL
//!
//! - Mainnet: `wss://mainnet.zklighter.elliot.ai/stream`
//! - Testnet: `wss://testnet.zklighter.elliot.ai/stream`

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::ports::{FeedConnector, FeedTransport, InboundFrame, TransportError};

/// Opens WebSocket connections with `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a new connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FeedConnector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, url: &str) -> Result<Self::Transport, TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(WebSocketTransport {
            stream,
            failed: false,
        })
    }
}

/// An open WebSocket connection.
///
/// Answers pings itself. After a receive error the connection is treated
/// as closed on the following read.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    failed: bool,
}

#[async_trait]
impl FeedTransport for WebSocketTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>> {
        if self.failed {
            return None;
        }

        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(InboundFrame::Text(text.to_string()))),
                Ok(Message::Binary(data)) => return Some(Ok(InboundFrame::Binary(data.to_vec()))),
                Ok(Message::Ping(data)) => {
                    if let Err(e) = self.stream.send(Message::Pong(data)).await {
                        return Some(Err(TransportError::Send(e.to_string())));
                    }
                }
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "Server sent close frame");
                    return None;
                }
                Ok(Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(TransportError::Receive(e.to_string())));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| TransportError::Close(e.to_string()))
    }
}
