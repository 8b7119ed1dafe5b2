//! Prometheus Metrics Module
//!
//! # Metrics
//!
//! - `lighter_trigger_messages_received_total{channel}`: messages delivered to the sink
//! - `lighter_trigger_decode_errors_total{channel}`: frames dropped as malformed
//! - `lighter_trigger_transport_errors_total{error_type}`: connect/send/receive/close errors
//! - `lighter_trigger_reconnects_total`: reconnects scheduled
//! - `lighter_trigger_connection_state`: current state code
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::application::ports::TransportError;
use crate::domain::streaming::ConnectionState;

static EXPORTER_INSTALLED: OnceLock<SocketAddr> = OnceLock::new();

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Later calls return the address of the first listener.
///
/// # Errors
///
/// Returns an error if the recorder or HTTP listener cannot be installed.
pub fn init_metrics(addr: SocketAddr) -> Result<SocketAddr, BuildError> {
    if let Some(existing) = EXPORTER_INSTALLED.get() {
        return Ok(*existing);
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_metrics();
    Ok(*EXPORTER_INSTALLED.get_or_init(|| addr))
}

fn register_metrics() {
    describe_counter!(
        "lighter_trigger_messages_received_total",
        "Messages received from the Lighter stream and delivered"
    );
    describe_counter!(
        "lighter_trigger_decode_errors_total",
        "Inbound frames dropped because they were not valid JSON"
    );
    describe_counter!(
        "lighter_trigger_transport_errors_total",
        "WebSocket transport errors by type"
    );
    describe_counter!(
        "lighter_trigger_reconnects_total",
        "Reconnects scheduled after an unplanned close"
    );
    describe_gauge!(
        "lighter_trigger_connection_state",
        "Connection state (0 idle, 1 connecting, 2 subscribed, 3 reconnecting, 4 stopped)"
    );
}

const fn transport_error_type(error: &TransportError) -> &'static str {
    match error {
        TransportError::Connect(_) => "connect",
        TransportError::Send(_) => "send",
        TransportError::Receive(_) => "receive",
        TransportError::Close(_) => "close",
    }
}

/// Record a message delivered to the sink.
pub fn record_message_received(channel: &str) {
    counter!(
        "lighter_trigger_messages_received_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// Record a frame dropped as malformed.
pub fn record_decode_error(channel: &str) {
    counter!(
        "lighter_trigger_decode_errors_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// Record a transport error.
pub fn record_transport_error(error: &TransportError) {
    counter!(
        "lighter_trigger_transport_errors_total",
        "error_type" => transport_error_type(error)
    )
    .increment(1);
}

/// Record a scheduled reconnect.
pub fn record_reconnect() {
    counter!("lighter_trigger_reconnects_total").increment(1);
}

/// Update the connection state gauge.
pub fn set_connection_state(state: ConnectionState) {
    gauge!("lighter_trigger_connection_state").set(f64::from(state.code()));
}
