//! Stream Codec
//!
//! JSON encoding of the outbound subscribe frame and decoding of inbound
//! frames into opaque JSON values.
//!
//! # Outbound
//!
//! ```json
//! {"type":"subscribe","channel":"account_all/42","auth":"..."}
//! ```
//!
//! `auth` is omitted unless the channel requires authentication and a
//! token is configured.
//!
//! # Inbound
//!
//! Any JSON value. Text and binary frames are both accepted; binary
//! frames must carry UTF-8 JSON.

use serde::Serialize;

use crate::application::ports::InboundFrame;
use crate::domain::channel::{ChannelIdentifier, SubscriptionConfig};
use crate::domain::streaming::InboundMessage;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame had no payload.
    #[error("empty frame")]
    EmptyFrame,
}

/// Subscribe request sent once per connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeFrame {
    #[serde(rename = "type")]
    kind: &'static str,
    /// Channel identifier.
    pub channel: String,
    /// Auth token for authenticated channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

impl SubscribeFrame {
    /// Build the frame for a resolved channel.
    #[must_use]
    pub fn new(channel: &ChannelIdentifier, config: &SubscriptionConfig) -> Self {
        Self {
            kind: "subscribe",
            channel: channel.as_str().to_string(),
            auth: config.subscribe_auth().map(str::to_string),
        }
    }
}

/// JSON codec for the Lighter stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode an inbound frame into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is empty or not valid JSON.
    pub fn decode(&self, frame: &InboundFrame) -> Result<InboundMessage, CodecError> {
        let payload = frame.as_bytes();
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Err(CodecError::EmptyFrame);
        }
        Ok(serde_json::from_slice(payload)?)
    }

    /// Encode a value to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::channel::{AuthToken, ChannelKind, resolve_channel};

    fn frame_json(config: &SubscriptionConfig) -> serde_json::Value {
        let channel = resolve_channel(config).unwrap();
        let frame = SubscribeFrame::new(&channel, config);
        let text = JsonCodec::new().encode(&frame).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn account_frame_without_token_has_no_auth() {
        let config = SubscriptionConfig::new(ChannelKind::AccountAll).with_account_index(42);
        assert_eq!(
            frame_json(&config),
            json!({"type": "subscribe", "channel": "account_all/42"})
        );
    }

    #[test]
    fn account_frame_with_token_has_auth() {
        let config = SubscriptionConfig::new(ChannelKind::AccountAll)
            .with_account_index(42)
            .with_auth_token(AuthToken::new("tok"));
        assert_eq!(
            frame_json(&config),
            json!({"type": "subscribe", "channel": "account_all/42", "auth": "tok"})
        );
    }

    #[test]
    fn public_frame_never_carries_token() {
        let config = SubscriptionConfig::new(ChannelKind::OrderBook)
            .with_market_index(5)
            .with_auth_token(AuthToken::new("tok"));
        assert_eq!(
            frame_json(&config),
            json!({"type": "subscribe", "channel": "order_book/5"})
        );
    }

    #[test]
    fn encoded_field_order() {
        let config = SubscriptionConfig::new(ChannelKind::Height);
        let channel = resolve_channel(&config).unwrap();
        let text = JsonCodec::new()
            .encode(&SubscribeFrame::new(&channel, &config))
            .unwrap();
        assert_eq!(text, r#"{"type":"subscribe","channel":"height"}"#);
    }

    #[test]
    fn decode_text_object() {
        let codec = JsonCodec::new();
        let frame = InboundFrame::Text(
            r#"{"type":"update/order_book","channel":"order_book:0"}"#.to_string(),
        );
        let value = codec.decode(&frame).unwrap();
        assert_eq!(value["type"], "update/order_book");
    }

    #[test]
    fn decode_any_json_value() {
        let codec = JsonCodec::new();
        assert_eq!(
            codec.decode(&InboundFrame::Text("[1,2]".to_string())).unwrap(),
            json!([1, 2])
        );
        assert_eq!(
            codec.decode(&InboundFrame::Text("42".to_string())).unwrap(),
            json!(42)
        );
    }

    #[test]
    fn decode_binary_utf8() {
        let codec = JsonCodec::new();
        let frame = InboundFrame::Binary(br#"{"height":123}"#.to_vec());
        assert_eq!(codec.decode(&frame).unwrap(), json!({"height": 123}));
    }

    #[test]
    fn decode_malformed_fails() {
        let codec = JsonCodec::new();
        let result = codec.decode(&InboundFrame::Text("{not json".to_string()));
        assert!(matches!(result, Err(CodecError::Json(_))));

        let binary = codec.decode(&InboundFrame::Binary(vec![0xff, 0xfe]));
        assert!(matches!(binary, Err(CodecError::Json(_))));
    }

    #[test]
    fn decode_empty_fails() {
        let codec = JsonCodec::new();
        assert!(matches!(
            codec.decode(&InboundFrame::Text("  ".to_string())),
            Err(CodecError::EmptyFrame)
        ));
    }
}
