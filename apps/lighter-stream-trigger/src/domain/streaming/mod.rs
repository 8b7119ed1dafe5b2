//! Connection Lifecycle Types
//!
//! The state machine driven by the connection manager:
//!
//! ```text
//! Idle ──► Connecting ──► Subscribed ──► Reconnecting ──► Connecting ...
//!   │           │              │               │
//!   └───────────┴──────────────┴───────────────┴────────► Stopped
//! ```
//!
//! `Stopped` is terminal and reachable from every state.

use std::fmt;

/// Inbound feed message. Opaque: forwarded without interpretation.
pub type InboundMessage = serde_json::Value;

/// Lifecycle state of a connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Created, not yet started.
    #[default]
    Idle,
    /// Opening the transport.
    Connecting,
    /// Subscribe frame sent, receiving messages.
    Subscribed,
    /// Transport closed, waiting for the reconnect delay.
    Reconnecting,
    /// Stopped explicitly or closed with reconnect disabled.
    Stopped,
}

impl ConnectionState {
    /// Check whether the state is terminal.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Check whether a transition to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Stopped, _) => false,
            (_, Self::Stopped)
            | (Self::Idle | Self::Reconnecting, Self::Connecting)
            | (Self::Connecting, Self::Subscribed | Self::Reconnecting)
            | (Self::Subscribed, Self::Reconnecting) => true,
            _ => false,
        }
    }

    /// Numeric code used for the connection state gauge.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Connecting => 1,
            Self::Subscribed => 2,
            Self::Reconnecting => 3,
            Self::Stopped => 4,
        }
    }

    /// State name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
            Self::Reconnecting => "reconnecting",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of connection counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionStats {
    /// Transport connect attempts.
    pub connect_attempts: u64,
    /// Subscribe frames sent successfully.
    pub subscriptions: u64,
    /// Reconnects scheduled after an unplanned close.
    pub reconnects_scheduled: u64,
    /// Messages handed to the sink.
    pub messages_delivered: u64,
    /// Frames dropped because they did not decode.
    pub decode_errors: u64,
    /// Transport errors observed (connect, send, receive).
    pub transport_errors: u64,
}
