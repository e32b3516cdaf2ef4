//! WebSocket connections accepted through axum.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use shuttle_protocol::WireMessage;
use std::net::SocketAddr;
use tracing::{debug, trace};

use crate::traits::{check_size, Connection, TransportError, DEFAULT_MAX_MESSAGE_SIZE};

/// What an inbound axum message means for the session.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Inbound {
    Data(WireMessage),
    Control,
    Close,
}

pub(crate) fn from_axum(message: Message) -> Inbound {
    match message {
        Message::Text(text) => Inbound::Data(WireMessage::Text(text)),
        Message::Binary(data) => Inbound::Data(WireMessage::Binary(Bytes::from(data))),
        Message::Ping(_) | Message::Pong(_) => Inbound::Control,
        Message::Close(_) => Inbound::Close,
    }
}

pub(crate) fn into_axum(message: WireMessage) -> Message {
    match message {
        WireMessage::Text(text) => Message::Text(text),
        WireMessage::Binary(data) => Message::Binary(data.to_vec()),
    }
}

/// A WebSocket accepted by axum.
pub struct AxumConnection {
    socket: WebSocket,
    remote_addr: Option<SocketAddr>,
    is_open: bool,
    max_message_size: usize,
}

impl AxumConnection {
    /// Wrap an upgraded socket.
    #[must_use]
    pub fn new(socket: WebSocket) -> Self {
        Self {
            socket,
            remote_addr: None,
            is_open: true,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    #[must_use]
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }
}

#[async_trait]
impl Connection for AxumConnection {
    async fn recv(&mut self) -> Result<Option<WireMessage>, TransportError> {
        if !self.is_open {
            return Err(TransportError::ConnectionClosed);
        }

        loop {
            match self.socket.recv().await {
                Some(Ok(message)) => match from_axum(message) {
                    Inbound::Data(data) => {
                        check_size(data.len(), self.max_message_size)?;
                        return Ok(Some(data));
                    }
                    Inbound::Control => {
                        // Pongs are queued by the socket itself.
                        trace!("Control frame");
                    }
                    Inbound::Close => {
                        debug!("Received close frame");
                        self.is_open = false;
                        return Ok(None);
                    }
                },
                Some(Err(e)) => {
                    self.is_open = false;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    debug!("WebSocket stream ended");
                    self.is_open = false;
                    return Ok(None);
                }
            }
        }
    }

    async fn send(&mut self, message: WireMessage) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::ConnectionClosed);
        }

        self.socket
            .send(into_axum(message))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.is_open {
            return Ok(()); // Already closed
        }
        self.is_open = false;

        self.socket
            .send(Message::Close(None))
            .await
            .map_err(|e| TransportError::Other(format!("Failed to close: {}", e)))
    }

    fn remote_addr(&self) -> Option<String> {
        self.remote_addr.map(|addr| addr.to_string())
    }

    fn is_open(&self) -> bool {
        self.is_open
    }
}
