//! # shuttle-protocol
//!
//! Wire values exchanged over the per-user location channel.
//!
//! After the upgrade the server sends a plaintext greeting, then every
//! inbound frame must carry one location ping encoded as JSON:
//!
//! ```json
//! {"longitude": 106.82, "latitude": -6.17}
//! ```
//!
//! Each accepted ping is answered with a fixed acknowledgement envelope,
//! echoed on the same frame kind (text or binary) as the ping.
//!
//! ## Example
//!
//! ```rust
//! use shuttle_protocol::{codec, Ack, WireMessage};
//!
//! let inbound = WireMessage::text(r#"{"longitude":12.34,"latitude":56.78}"#);
//! let ping = codec::decode_ping(inbound.payload()).unwrap();
//! assert_eq!(ping.latitude, 56.78);
//!
//! let reply = codec::encode_ack(&Ack::received(), inbound.kind()).unwrap();
//! assert!(reply.is_text());
//! ```

pub mod codec;
pub mod frames;

pub use codec::{decode_ping, encode_ack, ProtocolError};
pub use frames::{Ack, FrameKind, LocationPing, WireMessage, CONNECTED_GREETING};
