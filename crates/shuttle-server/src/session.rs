//! Per-connection session loop.
//!
//! A session drives one upgraded connection:
//!
//! ```text
//! Connecting → Validating → Evicting → Registered → Streaming → Closing → Closed
//!                  │                        │
//!                  └── unknown user ──▶ Closed
//!                                           └── greeting failed ──▶ Closing
//! ```
//!
//! Registration swaps the new handle into the registry and closes whatever
//! it displaced. Every read and write of a registered session races the
//! handle's close signal, so an evicted session stops even while blocked on
//! a slow client. Teardown only deregisters (and only marks the user
//! offline) if the registry still holds this session's own handle.

use shuttle_core::{
    ConnectionHandle, ConnectionRegistry, PresenceStatus, PresenceStore, UserDirectory, UserId,
};
use shuttle_protocol::codec::Codec;
use shuttle_protocol::{Ack, WireMessage};
use shuttle_transport::{Connection, TransportError};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info, trace, warn};

use crate::metrics;

/// Upper bound on sending the Close frame to a client that stopped reading.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared collaborators of every session.
#[derive(Clone)]
pub struct SessionContext {
    pub registry: Arc<ConnectionRegistry>,
    pub users: Arc<dyn UserDirectory>,
    pub presence: Arc<dyn PresenceStore>,
}

impl SessionContext {
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        users: Arc<dyn UserDirectory>,
        presence: Arc<dyn PresenceStore>,
    ) -> Self {
        Self {
            registry,
            users,
            presence,
        }
    }
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Validating,
    Evicting,
    Registered,
    Streaming,
    Closing,
    Closed,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user is unknown; nothing was registered.
    Rejected,
    /// The greeting could not be written.
    GreetingFailed,
    /// The client closed the connection.
    ClientClosed,
    /// A newer connection for the same user took over.
    Evicted,
    /// An inbound frame was not a location ping.
    Malformed,
    /// Reading or writing failed.
    TransportFailed,
}

impl SessionEnd {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEnd::Rejected => "rejected",
            SessionEnd::GreetingFailed => "greeting_failed",
            SessionEnd::ClientClosed => "client_closed",
            SessionEnd::Evicted => "evicted",
            SessionEnd::Malformed => "malformed",
            SessionEnd::TransportFailed => "transport_failed",
        }
    }
}

/// One connection's lifecycle.
pub struct Session<'a, C> {
    conn: C,
    user_id: UserId,
    ctx: &'a SessionContext,
    state: SessionState,
}

impl<'a, C: Connection> Session<'a, C> {
    #[must_use]
    pub fn new(conn: C, user_id: UserId, ctx: &'a SessionContext) -> Self {
        Self {
            conn,
            user_id,
            ctx,
            state: SessionState::Connecting,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn enter(&mut self, next: SessionState) {
        trace!(user = %self.user_id, from = ?self.state, to = ?next, "Session state");
        self.state = next;
    }

    /// Run the session to completion.
    pub async fn run(mut self) -> SessionEnd {
        self.enter(SessionState::Validating);
        if let Err(e) = self.ctx.users.fetch_user(&self.user_id).await {
            warn!(user = %self.user_id, error = %e, "Rejecting connection");
            metrics::record_error("identity");
            self.close_connection().await;
            self.enter(SessionState::Closed);
            return SessionEnd::Rejected;
        }

        self.enter(SessionState::Evicting);
        let handle = ConnectionHandle::new(self.user_id.clone());
        if let Some(previous) = self.ctx.registry.add(self.user_id.clone(), handle.clone()) {
            previous.close();
            metrics::record_eviction();
            info!(
                user = %self.user_id,
                evicted = %previous.id(),
                connection = %handle.id(),
                "Connection already exists, closed existing connection"
            );
        }

        self.enter(SessionState::Registered);
        info!(
            user = %self.user_id,
            connection = %handle.id(),
            remote = ?self.conn.remote_addr(),
            "Connection established"
        );
        set_presence(self.ctx, &self.user_id, PresenceStatus::Online).await;

        let end = match self.send_unless_closed(&handle, WireMessage::greeting()).await {
            None => self.evicted(&handle),
            Some(Ok(())) => {
                self.enter(SessionState::Streaming);
                self.stream(&handle).await
            }
            Some(Err(e)) => {
                error!(user = %self.user_id, error = %e, "Failed to send greeting");
                metrics::record_error("transport");
                SessionEnd::GreetingFailed
            }
        };

        self.enter(SessionState::Closing);
        self.teardown(&handle, end).await;
        self.enter(SessionState::Closed);
        end
    }

    async fn stream(&mut self, handle: &ConnectionHandle) -> SessionEnd {
        let codec = Codec::new();
        let ack = Ack::received();

        loop {
            let received = tokio::select! {
                biased;
                _ = handle.closed() => None,
                received = self.conn.recv() => Some(received),
            };

            let message = match received {
                None => return self.evicted(handle),
                Some(Ok(Some(message))) => message,
                Some(Ok(None)) => {
                    debug!(user = %self.user_id, "Client closed connection");
                    return SessionEnd::ClientClosed;
                }
                Some(Err(e)) => {
                    warn!(user = %self.user_id, error = %e, "Error reading message");
                    metrics::record_error("transport");
                    return SessionEnd::TransportFailed;
                }
            };
            let received_at = Instant::now();
            metrics::record_frame(message.len(), "inbound");

            let ping = match codec.decode(&message) {
                Ok(ping) => ping,
                Err(e) => {
                    warn!(user = %self.user_id, error = %e, "Message received is not a location");
                    metrics::record_error("protocol");
                    return SessionEnd::Malformed;
                }
            };

            info!(
                user = %self.user_id,
                longitude = ping.longitude,
                latitude = ping.latitude,
                "Location received"
            );
            let reply = match codec.reply(&message, &ack) {
                Ok(reply) => reply,
                Err(e) => {
                    error!(user = %self.user_id, error = %e, "Failed to encode acknowledgement");
                    metrics::record_error("protocol");
                    return SessionEnd::TransportFailed;
                }
            };

            let size = reply.len();
            match self.send_unless_closed(handle, reply).await {
                None => return self.evicted(handle),
                Some(Err(e)) => {
                    warn!(user = %self.user_id, error = %e, "Error writing acknowledgement");
                    metrics::record_error("transport");
                    return SessionEnd::TransportFailed;
                }
                Some(Ok(())) => {}
            }
            metrics::record_frame(size, "outbound");
            metrics::record_ping(received_at.elapsed().as_secs_f64());
        }
    }

    /// Send `message`, giving up as soon as `handle` is closed.
    ///
    /// Returns `None` when the close signal won.
    async fn send_unless_closed(
        &mut self,
        handle: &ConnectionHandle,
        message: WireMessage,
    ) -> Option<Result<(), TransportError>> {
        tokio::select! {
            biased;
            _ = handle.closed() => None,
            sent = self.conn.send(message) => Some(sent),
        }
    }

    fn evicted(&self, handle: &ConnectionHandle) -> SessionEnd {
        debug!(user = %self.user_id, connection = %handle.id(), "Closed by newer connection");
        SessionEnd::Evicted
    }

    async fn close_connection(&mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.conn.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => trace!(user = %self.user_id, error = %e, "Close after session end"),
            Err(_) => debug!(user = %self.user_id, "Client did not take the close frame"),
        }
    }

    async fn teardown(&mut self, handle: &ConnectionHandle, end: SessionEnd) {
        let owned = self
            .ctx
            .registry
            .remove_if_current(self.user_id.as_str(), handle.id());
        handle.close();

        // Presence goes first: closing the socket may wait on the network.
        if owned {
            set_presence(self.ctx, &self.user_id, PresenceStatus::Offline).await;
        } else {
            debug!(user = %self.user_id, "Newer connection owns the user, presence unchanged");
        }

        self.close_connection().await;

        info!(
            user = %self.user_id,
            connection = %handle.id(),
            reason = end.as_str(),
            "Connection closed"
        );
    }
}

/// Best-effort presence write; failures never end the session.
async fn set_presence(ctx: &SessionContext, user_id: &UserId, status: PresenceStatus) {
    if let Err(e) = ctx
        .presence
        .set_status(user_id, status, SystemTime::now())
        .await
    {
        warn!(user = %user_id, status = %status, error = %e, "Failed to update user status");
        metrics::record_error("presence");
    }
}

/// Run a session for `user_id` over `conn`.
pub async fn run_session<C: Connection>(
    conn: C,
    user_id: UserId,
    ctx: &SessionContext,
) -> SessionEnd {
    Session::new(conn, user_id, ctx).run().await
}
