#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Lighter Stream Trigger - Real-time Feed Subscriber
//!
//! Keeps a single subscription to one channel of the Lighter exchange
//! WebSocket stream alive and hands every decoded message to a sink.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure types
//!   - `channel`: Channel kinds, subscription configuration, channel resolution
//!   - `streaming`: Connection state machine and statistics
//!
//! - **Application**: Port definitions
//!   - `ports`: Feed connector/transport and message sink interfaces
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `lighter`: Connection manager, codec, reconnect policy, WebSocket transport
//!   - `config`: Environment-based configuration
//!   - `metrics`: Prometheus instrumentation
//!   - `telemetry`: Tracing and OpenTelemetry setup
//!
//! # Data Flow
//!
//! ```text
//!                    ┌────────────────────┐
//! SubscriptionConfig │  resolve_channel   │
//!        ───────────►│  SubscribeFrame    │
//!                    └─────────┬──────────┘
//!                              │ {"type":"subscribe",...}
//!                              ▼
//! Lighter WS ◄──────── ConnectionManager ────────► MessageSink
//!  /stream   ─frames─►  (decode, reconnect)  JSON
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Channel and connection types with no I/O.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::channel::{
    AuthToken, ChannelIdentifier, ChannelKind, ChannelScope, ConfigurationError,
    DEFAULT_RECONNECT_INTERVAL, SubscriptionConfig, resolve_channel,
};
pub use domain::streaming::{ConnectionState, ConnectionStats, InboundMessage};

// Ports
pub use application::ports::{
    FeedConnector, FeedTransport, InboundFrame, MessageSink, TransportError,
};

// Lighter stream
pub use infrastructure::lighter::{
    ConnectionManager, PendingReconnect, ReconnectConfig, ReconnectPolicy, StopHandle,
    StreamError, WebSocketConnector,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, Credentials, Environment, TriggerConfig};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
