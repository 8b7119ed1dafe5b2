//! Message Sink Port (Driven Port)
//!
//! Receives each decoded inbound message, once, in transport arrival order.

use tokio::sync::mpsc;

use crate::domain::streaming::InboundMessage;

/// Downstream consumer of decoded feed messages.
///
/// Called from the connection task; implementations must not block.
/// Formatting payloads for a consumer is the consumer's job.
pub trait MessageSink: Send + Sync + 'static {
    /// Deliver one message.
    fn deliver(&self, message: InboundMessage);
}

impl<F> MessageSink for F
where
    F: Fn(InboundMessage) + Send + Sync + 'static,
{
    fn deliver(&self, message: InboundMessage) {
        self(message);
    }
}

impl MessageSink for mpsc::UnboundedSender<InboundMessage> {
    fn deliver(&self, message: InboundMessage) {
        if self.send(message).is_err() {
            tracing::debug!("Message sink receiver dropped, discarding message");
        }
    }
}
