//! Transport abstraction traits.

use async_trait::async_trait;
use shuttle_protocol::WireMessage;
use thiserror::Error;

/// Default maximum inbound message size (64 KiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Inbound message exceeds the configured limit.
    #[error("Message size {size} exceeds maximum {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Check an inbound message against the size limit.
///
/// # Errors
///
/// Returns [`TransportError::MessageTooLarge`] if `size > max`.
pub fn check_size(size: usize, max: usize) -> Result<(), TransportError> {
    if size > max {
        return Err(TransportError::MessageTooLarge { size, max });
    }
    Ok(())
}

/// An accepted bidirectional connection to one client.
///
/// Only data frames surface through [`recv`](Connection::recv); control
/// frames are answered by the implementation.
#[async_trait]
pub trait Connection: Send {
    /// Receive the next data frame.
    ///
    /// Returns `None` once the client closed the connection.
    async fn recv(&mut self) -> Result<Option<WireMessage>, TransportError>;

    /// Send a data frame.
    async fn send(&mut self, message: WireMessage) -> Result<(), TransportError>;

    /// Close the connection. Closing twice is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Get the remote address of the connection, if available.
    fn remote_addr(&self) -> Option<String> {
        None
    }

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}
