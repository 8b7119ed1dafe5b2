//! Feed Transport Port (Driven Port)
//!
//! Abstracts the streaming connection so the connection manager can be
//! driven by a real WebSocket or by a scripted transport in tests.

use async_trait::async_trait;
use thiserror::Error;

/// Transport failures. Logged by the manager, never fatal on their own.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Opening the connection failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    Receive(String),

    /// Closing the connection failed.
    #[error("close failed: {0}")]
    Close(String),
}

/// A data frame received from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl InboundFrame {
    /// Frame payload as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(data) => data,
        }
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Check whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Opens connections to a feed endpoint.
#[async_trait]
pub trait FeedConnector: Send + Sync + 'static {
    /// Connection type produced by this connector.
    type Transport: FeedTransport;

    /// Open a connection to `url`.
    async fn connect(&self, url: &str) -> Result<Self::Transport, TransportError>;
}

/// One open feed connection.
#[async_trait]
pub trait FeedTransport: Send + 'static {
    /// Send a text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Wait for the next data frame.
    ///
    /// Returns `None` once the connection is closed. An `Err` reports a
    /// transport error without implying closure; the caller keeps reading
    /// until `None`.
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}
