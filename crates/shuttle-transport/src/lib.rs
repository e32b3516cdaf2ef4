//! # shuttle-transport
//!
//! Connection abstraction for the shuttle location channel.
//!
//! [`AxumConnection`] wraps a socket accepted through axum's
//! `WebSocketUpgrade`. It exposes data frames as
//! [`WireMessage`](shuttle_protocol::WireMessage) and keeps control frames
//! (ping/pong) to itself.
//!
//! ```rust,ignore
//! use shuttle_transport::Connection;
//!
//! async fn echo(mut conn: impl Connection) {
//!     while let Ok(Some(message)) = conn.recv().await {
//!         if conn.send(message).await.is_err() {
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod traits;
pub mod websocket;

pub use traits::{Connection, TransportError};
pub use websocket::AxumConnection;
