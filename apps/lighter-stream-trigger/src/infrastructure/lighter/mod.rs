//! Lighter Stream Adapters
//!
//! Connects to the Lighter real-time feed and keeps one channel
//! subscription alive:
//!
//! - **client**: connection manager and its lifecycle task
//! - **codec**: subscribe frame encoding, inbound JSON decoding
//! - **reconnect**: fixed-interval reconnect policy
//! - **transport**: `tokio-tungstenite` WebSocket transport

pub mod client;
pub mod codec;
pub mod reconnect;
pub mod transport;

pub use client::{ConnectionManager, PendingReconnect, StopHandle, StreamError};
pub use codec::{CodecError, JsonCodec, SubscribeFrame};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use transport::{WebSocketConnector, WebSocketTransport};
