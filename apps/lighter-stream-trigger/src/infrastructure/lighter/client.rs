//! Lighter Stream Connection Manager
//!
//! Owns one connection to the Lighter real-time feed. After `start` the
//! manager subscribes to the resolved channel, forwards every decoded
//! message to the sink in arrival order, and reconnects on unplanned
//! closes until `stop` is called.
//!
//! # Lifecycle
//!
//! 1. `start` resolves the channel and encodes the subscribe frame once
//! 2. The connection task opens the transport and sends the frame
//! 3. Inbound frames are decoded and delivered; bad frames are dropped
//! 4. On close, the reconnect policy schedules a single pending reconnect
//! 5. `stop` cancels everything and closes the open transport
//!
//! Transport errors are logged only. Closure is driven by the transport
//! reporting the connection as closed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::codec::{CodecError, JsonCodec, SubscribeFrame};
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::application::ports::{
    FeedConnector, FeedTransport, InboundFrame, MessageSink, TransportError,
};
use crate::domain::channel::{
    ChannelIdentifier, ConfigurationError, SubscriptionConfig, resolve_channel,
};
use crate::domain::streaming::{ConnectionState, ConnectionStats, InboundMessage};
use crate::infrastructure::metrics;

// =============================================================================
// Error Type
// =============================================================================

/// Errors returned when starting a connection manager.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Subscription configuration is incomplete.
    #[error("invalid subscription configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Subscribe frame could not be encoded.
    #[error("failed to encode subscribe frame: {0}")]
    Encode(#[from] CodecError),

    /// The manager was already started.
    #[error("connection manager already started")]
    AlreadyStarted,

    /// The manager was stopped and cannot be restarted.
    #[error("connection manager stopped")]
    Stopped,
}

// =============================================================================
// Pending Reconnect
// =============================================================================

/// The single scheduled reconnect of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReconnect {
    /// Reconnection attempt number since the last subscription.
    pub attempt: u32,
    /// Delay the reconnect was scheduled with.
    pub delay: Duration,
    /// When the reconnect fires.
    pub due: Instant,
}

// =============================================================================
// Shared State
// =============================================================================

#[derive(Debug, Default)]
struct Inner {
    state: ConnectionState,
    pending: Option<PendingReconnect>,
}

impl Inner {
    /// Set the state and its gauge together, under the state lock.
    fn set_state(&mut self, next: ConnectionState) {
        tracing::trace!(from = %self.state, to = %next, "Connection state transition");
        self.state = next;
        metrics::set_connection_state(next);
    }
}

#[derive(Debug, Default)]
struct Counters {
    connect_attempts: AtomicU64,
    subscriptions: AtomicU64,
    reconnects_scheduled: AtomicU64,
    messages_delivered: AtomicU64,
    decode_errors: AtomicU64,
    transport_errors: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            subscriptions: self.subscriptions.load(Ordering::Relaxed),
            reconnects_scheduled: self.reconnects_scheduled.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// State shared between the manager, its stop handles and the connection task.
///
/// Sink delivery and the transition to `Stopped` both hold `gate`, so no
/// message reaches the sink once `Stopped` is set. The gate is re-entrant
/// so a sink may stop the manager from inside `deliver`.
#[derive(Debug, Default)]
struct Shared {
    inner: Mutex<Inner>,
    gate: ReentrantMutex<()>,
    cancel: CancellationToken,
    counters: Counters,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    fn is_stopped(&self) -> bool {
        self.state().is_stopped()
    }

    /// Apply a transition if the state machine allows it.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut inner = self.inner.lock();
        if !inner.state.can_transition_to(next) {
            return false;
        }
        inner.set_state(next);
        true
    }

    /// Leave `Idle` for `Connecting` in one step.
    fn begin(&self) -> Result<(), StreamError> {
        let mut inner = self.inner.lock();
        match inner.state {
            ConnectionState::Idle => {
                inner.set_state(ConnectionState::Connecting);
                Ok(())
            }
            ConnectionState::Stopped => Err(StreamError::Stopped),
            _ => Err(StreamError::AlreadyStarted),
        }
    }

    /// Move to `Stopped`, drop any pending reconnect and cancel the task.
    ///
    /// Returns `false` if already stopped.
    fn stop(&self) -> bool {
        let _gate = self.gate.lock();
        let mut inner = self.inner.lock();
        if inner.state.is_stopped() {
            return false;
        }
        inner.set_state(ConnectionState::Stopped);
        inner.pending = None;
        drop(inner);

        self.cancel.cancel();
        true
    }

    /// Record the pending reconnect and move to `Reconnecting`.
    ///
    /// Returns `None` if the manager was stopped in the meantime.
    fn schedule_reconnect(&self, attempt: u32, delay: Duration) -> Option<Instant> {
        let mut inner = self.inner.lock();
        if !inner.state.can_transition_to(ConnectionState::Reconnecting) {
            return None;
        }
        debug_assert!(inner.pending.is_none(), "reconnect already pending");

        let due = Instant::now() + delay;
        inner.set_state(ConnectionState::Reconnecting);
        inner.pending = Some(PendingReconnect {
            attempt,
            delay,
            due,
        });
        drop(inner);

        bump(&self.counters.reconnects_scheduled);
        metrics::record_reconnect();
        Some(due)
    }

    /// Consume the pending reconnect and move to `Connecting`.
    fn fire_reconnect(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.state.can_transition_to(ConnectionState::Connecting) {
            return false;
        }
        inner.pending = None;
        inner.set_state(ConnectionState::Connecting);
        true
    }

    /// Hand a message to the sink unless stopped.
    fn deliver(&self, sink: &dyn MessageSink, message: InboundMessage) -> bool {
        let _gate = self.gate.lock();
        if self.is_stopped() {
            return false;
        }
        sink.deliver(message);
        bump(&self.counters.messages_delivered);
        true
    }

    fn record_transport_error(&self, error: &TransportError) {
        bump(&self.counters.transport_errors);
        metrics::record_transport_error(error);
        tracing::error!(error = %error, "Lighter stream transport error");
    }
}

// =============================================================================
// Stop Handle
// =============================================================================

/// Cloneable handle that stops a manager without waiting for its task.
///
/// Safe to call from inside a [`MessageSink`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Stop the manager. Idempotent.
    ///
    /// No message is delivered after this returns, and no reconnect is
    /// scheduled. The connection task closes the open transport shortly
    /// afterwards.
    pub fn stop(&self) {
        if self.shared.stop() {
            tracing::info!("Lighter stream stop requested");
        }
    }

    /// Check whether the manager has stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    /// Wait until the manager stops, explicitly or because the transport
    /// closed with reconnect disabled.
    pub async fn stopped(&self) {
        self.shared.cancel.cancelled().await;
    }
}

// =============================================================================
// Connection Manager
// =============================================================================

/// Connection manager for one Lighter stream subscription.
///
/// # Example
///
/// ```no_run
/// use lighter_stream_trigger::domain::channel::{ChannelKind, SubscriptionConfig};
/// use lighter_stream_trigger::infrastructure::lighter::{ConnectionManager, WebSocketConnector};
///
/// # async fn run() -> Result<(), lighter_stream_trigger::infrastructure::lighter::StreamError> {
/// let manager = ConnectionManager::new(
///     WebSocketConnector::new(),
///     "wss://mainnet.zklighter.elliot.ai/stream",
/// );
///
/// let config = SubscriptionConfig::new(ChannelKind::OrderBook).with_market_index(0);
/// manager.start(config, |message: serde_json::Value| println!("{message}"))?;
///
/// // ...
/// manager.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionManager<C: FeedConnector> {
    connector: Arc<C>,
    endpoint: String,
    shared: Arc<Shared>,
    channel: OnceLock<ChannelIdentifier>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: FeedConnector> ConnectionManager<C> {
    /// Create an idle manager for the given feed endpoint.
    #[must_use]
    pub fn new(connector: C, endpoint: impl Into<String>) -> Self {
        Self {
            connector: Arc::new(connector),
            endpoint: endpoint.into(),
            shared: Arc::new(Shared::default()),
            channel: OnceLock::new(),
            task: Mutex::new(None),
        }
    }

    /// Resolve the channel and start the connection task.
    ///
    /// Returns the resolved channel identifier.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::Configuration` if the channel cannot be
    /// resolved (no connection is attempted), or `AlreadyStarted` /
    /// `Stopped` if the manager is not idle.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start<S: MessageSink>(
        &self,
        config: SubscriptionConfig,
        sink: S,
    ) -> Result<ChannelIdentifier, StreamError> {
        let channel = resolve_channel(&config)?;
        let codec = JsonCodec::new();
        let frame = codec.encode(&SubscribeFrame::new(&channel, &config))?;

        self.shared.begin()?;

        let _ = self.channel.set(channel.clone());

        tracing::info!(
            channel = %channel,
            endpoint = %self.endpoint,
            authenticated = config.subscribe_auth().is_some(),
            reconnect = config.reconnect,
            "Starting Lighter stream"
        );

        let task = ConnectionTask {
            connector: Arc::clone(&self.connector),
            endpoint: self.endpoint.clone(),
            channel: channel.clone(),
            frame,
            metric_label: config.channel_kind.to_string(),
            codec,
            policy: ReconnectPolicy::new(ReconnectConfig::from_subscription(&config)),
            sink: Arc::new(sink),
            shared: Arc::clone(&self.shared),
        };

        *self.task.lock() = Some(tokio::spawn(task.run()));
        Ok(channel)
    }

    /// Stop the manager and wait for the connection task to finish.
    ///
    /// Idempotent: later calls return immediately.
    pub async fn stop(&self) {
        self.stop_handle().stop();

        let handle = self.task.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
            && e.is_panic()
        {
            tracing::error!(error = %e, "Lighter stream task panicked");
        }
    }

    /// Handle for stopping the manager from elsewhere.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// The scheduled reconnect, if any.
    #[must_use]
    pub fn pending_reconnect(&self) -> Option<PendingReconnect> {
        self.shared.inner.lock().pending
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> ConnectionStats {
        self.shared.counters.snapshot()
    }

    /// Resolved channel, once started.
    #[must_use]
    pub fn channel(&self) -> Option<&ChannelIdentifier> {
        self.channel.get()
    }

    /// Feed endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl<C: FeedConnector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

// =============================================================================
// Connection Task
// =============================================================================

/// How one connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// The transport closed or never opened.
    Closed,
    /// The manager was stopped.
    Cancelled,
}

struct ConnectionTask<C: FeedConnector> {
    connector: Arc<C>,
    endpoint: String,
    channel: ChannelIdentifier,
    frame: String,
    metric_label: String,
    codec: JsonCodec,
    policy: ReconnectPolicy,
    sink: Arc<dyn MessageSink>,
    shared: Arc<Shared>,
}

impl<C: FeedConnector> ConnectionTask<C> {
    async fn run(mut self) {
        loop {
            if self.session().await == SessionEnd::Cancelled || self.shared.is_stopped() {
                break;
            }

            tracing::warn!(channel = %self.channel, "Lighter stream connection lost");

            let Some(delay) = self.policy.next_delay() else {
                tracing::info!(channel = %self.channel, "Reconnect disabled, stream ended");
                self.shared.stop();
                break;
            };

            let attempt = self.policy.attempt_count();
            let Some(due) = self.shared.schedule_reconnect(attempt, delay) else {
                break;
            };

            tracing::info!(
                attempt,
                delay_ms = delay.as_millis(),
                "Reconnecting to Lighter stream"
            );

            tokio::select! {
                biased;
                () = self.shared.cancel.cancelled() => break,
                () = tokio::time::sleep_until(due) => {}
            }

            if !self.shared.fire_reconnect() {
                break;
            }
        }

        tracing::debug!(channel = %self.channel, "Lighter stream task finished");
    }

    /// Connect, subscribe and stream until the transport closes or the
    /// manager stops.
    async fn session(&mut self) -> SessionEnd {
        bump(&self.shared.counters.connect_attempts);
        tracing::info!(url = %self.endpoint, "Connecting to Lighter stream");

        let connected = tokio::select! {
            biased;
            () = self.shared.cancel.cancelled() => return SessionEnd::Cancelled,
            result = self.connector.connect(&self.endpoint) => result,
        };

        let mut transport = match connected {
            Ok(transport) => transport,
            Err(e) => {
                self.shared.record_transport_error(&e);
                return SessionEnd::Closed;
            }
        };

        let sent = tokio::select! {
            biased;
            () = self.shared.cancel.cancelled() => {
                Self::close(&mut transport).await;
                return SessionEnd::Cancelled;
            }
            result = transport.send_text(self.frame.clone()) => result,
        };

        match sent {
            Ok(()) => {
                if self.shared.transition(ConnectionState::Subscribed) {
                    self.policy.reset();
                    bump(&self.shared.counters.subscriptions);
                    tracing::info!(channel = %self.channel, "Subscribed to Lighter channel");
                }
            }
            Err(e) => self.shared.record_transport_error(&e),
        }

        loop {
            tokio::select! {
                biased;
                () = self.shared.cancel.cancelled() => {
                    Self::close(&mut transport).await;
                    return SessionEnd::Cancelled;
                }
                frame = transport.next_frame() => match frame {
                    Some(Ok(frame)) => self.handle_frame(&frame),
                    Some(Err(e)) => self.shared.record_transport_error(&e),
                    None => return SessionEnd::Closed,
                },
            }
        }
    }

    fn handle_frame(&self, frame: &InboundFrame) {
        match self.codec.decode(frame) {
            Ok(message) => {
                if self.shared.deliver(self.sink.as_ref(), message) {
                    metrics::record_message_received(&self.metric_label);
                }
            }
            Err(e) => {
                bump(&self.shared.counters.decode_errors);
                metrics::record_decode_error(&self.metric_label);
                tracing::error!(error = %e, len = frame.len(), "Failed to parse stream message");
            }
        }
    }

    async fn close(transport: &mut C::Transport) {
        if let Err(e) = transport.close().await {
            tracing::debug!(error = %e, "Error closing Lighter stream");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
