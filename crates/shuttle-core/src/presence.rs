//! Presence tracking for connected users.
//!
//! Presence is persisted outside the process; the session only ever
//! writes it through [`PresenceStore`] and treats every write as
//! best-effort.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::user::UserId;

/// Online status of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    #[default]
    Offline,
}

impl PresenceStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted presence of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub status: PresenceStatus,
    /// When the status was last written.
    pub last_active_at: Option<SystemTime>,
}

impl PresenceRecord {
    /// Last activity as milliseconds since the Unix epoch.
    #[must_use]
    pub fn last_active_ms(&self) -> Option<u64> {
        self.last_active_at
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
    }
}

/// Presence store errors.
#[derive(Debug, Error)]
pub enum PresenceError {
    /// No user with this identifier.
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    /// The backing store could not be reached.
    #[error("Presence store unavailable: {0}")]
    Unavailable(String),
}

/// Persists a user's online/offline status.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Set the status of a user, stamped with `at`.
    async fn set_status(
        &self,
        user_id: &UserId,
        status: PresenceStatus,
        at: SystemTime,
    ) -> Result<(), PresenceError>;

    /// Fetch the current presence of a user.
    async fn fetch_status(&self, user_id: &UserId) -> Result<PresenceRecord, PresenceError>;
}
