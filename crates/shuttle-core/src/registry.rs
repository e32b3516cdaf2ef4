//! Registry of live connections.
//!
//! Maps each user to at most one [`ConnectionHandle`]. Every operation
//! takes one process-wide lock for the duration of the map access only;
//! no I/O ever happens while it is held.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::user::UserId;

static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next connection ID.
    #[must_use]
    pub fn next() -> Self {
        Self(CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{:x}", self.0)
    }
}

/// Handle to one live connection.
///
/// Clones share the same close signal. The session owning the socket
/// waits on [`ConnectionHandle::closed`] next to its reads; anyone holding
/// a clone can end that session with [`ConnectionHandle::close`].
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    user_id: UserId,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ConnectionHandle {
    /// Create a handle for a freshly accepted connection.
    #[must_use]
    pub fn new(user_id: impl Into<UserId>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            id: ConnectionId::next(),
            user_id: user_id.into(),
            shutdown: Arc::new(shutdown),
        }
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Signal the owning session to close the connection.
    ///
    /// Returns `true` if this call closed it, `false` if it was already closed.
    pub fn close(&self) -> bool {
        let was_closed = self.shutdown.send_replace(true);
        if !was_closed {
            debug!(connection = %self.id, user = %self.user_id, "Connection handle closed");
        }
        !was_closed
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        let mut rx = self.shutdown.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Check if two handles refer to the same connection.
    #[must_use]
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// The connection registry.
///
/// Constructed once at startup and shared by every session task.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<UserId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, ConnectionHandle>> {
        // Map operations never leave the map half-updated, so a poisoned
        // lock still guards a consistent map.
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `handle` under `user_id`, replacing any previous handle.
    ///
    /// Returns the displaced handle. Closing it is up to the caller.
    pub fn add(&self, user_id: UserId, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let connection = handle.id();
        let previous = self.lock().insert(user_id.clone(), handle);
        trace!(
            user = %user_id,
            connection = %connection,
            displaced = previous.is_some(),
            "Registered connection"
        );
        previous
    }

    /// Remove the entry for `user_id`, if any.
    pub fn remove(&self, user_id: &str) -> Option<ConnectionHandle> {
        let removed = self.lock().remove(user_id);
        if let Some(handle) = &removed {
            trace!(user = %user_id, connection = %handle.id(), "Removed connection");
        }
        removed
    }

    /// Remove the entry for `user_id` only if it still holds `connection`.
    ///
    /// Returns `true` if the entry was removed.
    pub fn remove_if_current(&self, user_id: &str, connection: ConnectionId) -> bool {
        let mut connections = self.lock();
        let is_current = connections
            .get(user_id)
            .is_some_and(|current| current.id() == connection);
        if !is_current {
            return false;
        }

        connections.remove(user_id);
        drop(connections);
        trace!(user = %user_id, connection = %connection, "Removed connection");
        true
    }

    /// Get the live handle for `user_id`.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.lock().get(user_id).cloned()
    }

    #[must_use]
    pub fn contains(&self, user_id: &str) -> bool {
        self.lock().contains_key(user_id)
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
