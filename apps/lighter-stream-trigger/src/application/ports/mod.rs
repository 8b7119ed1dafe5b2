//! Port Interfaces
//!
//! ## Driven Ports (Outbound)
//!
//! - `FeedConnector` / `FeedTransport`: open and drive a connection to
//!   the Lighter stream endpoint
//! - `MessageSink`: hand decoded messages to the downstream consumer

mod sink;
mod transport;

pub use sink::MessageSink;
pub use transport::{FeedConnector, FeedTransport, InboundFrame, TransportError};
