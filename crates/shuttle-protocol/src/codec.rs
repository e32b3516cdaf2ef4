//! JSON codec for location pings and acknowledgements.

use bytes::Bytes;
use thiserror::Error;

use crate::frames::{Ack, FrameKind, LocationPing, WireMessage};

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload is not a location ping.
    #[error("Not a location ping: {0}")]
    NotALocation(#[source] serde_json::Error),

    /// JSON encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decode a location ping from a frame payload.
///
/// The payload must be a JSON object with exactly the numeric fields
/// `longitude` and `latitude`.
///
/// # Errors
///
/// Returns [`ProtocolError::NotALocation`] for any other shape.
pub fn decode_ping(payload: &[u8]) -> Result<LocationPing, ProtocolError> {
    serde_json::from_slice(payload).map_err(ProtocolError::NotALocation)
}

/// Encode an acknowledgement as a frame of the given kind.
///
/// # Errors
///
/// Returns an error if JSON encoding fails.
pub fn encode_ack(ack: &Ack, kind: FrameKind) -> Result<WireMessage, ProtocolError> {
    let json = serde_json::to_string(ack).map_err(ProtocolError::Encode)?;

    Ok(match kind {
        FrameKind::Text => WireMessage::Text(json),
        FrameKind::Binary => WireMessage::Binary(Bytes::from(json.into_bytes())),
    })
}

/// Stateless codec handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct Codec;

impl Codec {
    /// Create a new codec.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Decode a location ping.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a location ping.
    pub fn decode(&self, message: &WireMessage) -> Result<LocationPing, ProtocolError> {
        decode_ping(message.payload())
    }

    /// Encode the reply to `message`, mirroring its frame kind.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn reply(&self, message: &WireMessage, ack: &Ack) -> Result<WireMessage, ProtocolError> {
        encode_ack(ack, message.kind())
    }
}
