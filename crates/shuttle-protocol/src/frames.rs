//! Frame types for the location channel.
//!
//! Payloads are JSON. The frame kind (text or binary) only matters for
//! replies, which mirror the kind of the frame that triggered them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Plaintext frame sent once a session is registered.
pub const CONNECTED_GREETING: &str = "Connected to websocket";

/// Data frame kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Text,
    Binary,
}

/// A data frame as read from or written to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Bytes),
}

impl WireMessage {
    /// Create a text frame.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        WireMessage::Text(text.into())
    }

    /// Create a binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        WireMessage::Binary(data.into())
    }

    /// The greeting frame sent after registration.
    #[must_use]
    pub fn greeting() -> Self {
        WireMessage::text(CONNECTED_GREETING)
    }

    /// Get the frame kind.
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        match self {
            WireMessage::Text(_) => FrameKind::Text,
            WireMessage::Binary(_) => FrameKind::Binary,
        }
    }

    /// Get the raw payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        match self {
            WireMessage::Text(text) => text.as_bytes(),
            WireMessage::Binary(data) => data,
        }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload().len()
    }

    /// Check if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload().is_empty()
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, WireMessage::Text(_))
    }
}

/// A location ping sent by a connected client.
///
/// Only lives for one iteration of the session loop; it is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationPing {
    pub longitude: f64,
    pub latitude: f64,
}

impl LocationPing {
    #[must_use]
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// Acknowledgement envelope written back for every accepted ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// HTTP-style status code.
    pub code: u16,
    /// Status text.
    pub status: String,
    /// Human-readable message.
    pub message: String,
}

impl Ack {
    /// The envelope acknowledging a received ping.
    #[must_use]
    pub fn received() -> Self {
        Self {
            code: 200,
            status: "OK".to_string(),
            message: "Data received successfully".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_kind() {
        assert_eq!(WireMessage::text("hi").kind(), FrameKind::Text);
        assert_eq!(
            WireMessage::binary(b"hi".to_vec()).kind(),
            FrameKind::Binary
        );
    }

    #[test]
    fn test_payload_bytes() {
        let text = WireMessage::text("abc");
        let binary = WireMessage::binary(b"abc".to_vec());
        assert_eq!(text.payload(), binary.payload());
        assert_eq!(text.len(), 3);
        assert!(!binary.is_empty());
    }

    #[test]
    fn test_greeting() {
        assert_eq!(
            WireMessage::greeting(),
            WireMessage::Text("Connected to websocket".to_string())
        );
    }

    #[test]
    fn test_ack_field_order() {
        let json = serde_json::to_string(&Ack::received()).unwrap();
        assert_eq!(
            json,
            r#"{"code":200,"status":"OK","message":"Data received successfully"}"#
        );
    }
}
