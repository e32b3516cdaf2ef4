//! In-memory user table.
//!
//! Implements both [`UserDirectory`] and [`PresenceStore`] over one
//! concurrent map, so presence writes land on the user row the same way
//! they would on a `users` table.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::SystemTime;
use tracing::debug;

use crate::directory::{DirectoryError, UserDirectory};
use crate::presence::{PresenceError, PresenceRecord, PresenceStatus, PresenceStore};
use crate::user::{UserId, UserRecord};

/// Concurrent in-memory user store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<UserId, UserRecord>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with users.
    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let store = Self::new();
        for user in users {
            store.insert(user);
        }
        store
    }

    /// Insert or replace a user.
    ///
    /// Returns the previous record, if any.
    pub fn insert(&self, user: UserRecord) -> Option<UserRecord> {
        debug!(user = %user.id, role = %user.role(), "Storing user");
        self.users.insert(user.id.clone(), user)
    }

    /// Soft-delete a user.
    ///
    /// Returns `true` if a live user was deleted.
    pub fn soft_delete(&self, user_id: &str) -> bool {
        match self.users.get_mut(user_id) {
            Some(mut user) if !user.is_deleted() => {
                user.deleted_at = Some(SystemTime::now());
                debug!(user = %user_id, "Soft-deleted user");
                true
            }
            _ => false,
        }
    }

    /// Get a copy of a user record, including soft-deleted ones.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<UserRecord> {
        self.users.get(user_id).map(|u| u.clone())
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn fetch_user(&self, user_id: &UserId) -> Result<UserRecord, DirectoryError> {
        match self.users.get(user_id.as_str()) {
            Some(user) if !user.is_deleted() => Ok(user.clone()),
            _ => Err(DirectoryError::NotFound(user_id.clone())),
        }
    }
}

#[async_trait]
impl PresenceStore for MemoryStore {
    async fn set_status(
        &self,
        user_id: &UserId,
        status: PresenceStatus,
        at: SystemTime,
    ) -> Result<(), PresenceError> {
        let mut user = self
            .users
            .get_mut(user_id.as_str())
            .ok_or_else(|| PresenceError::UnknownUser(user_id.clone()))?;

        user.status = status;
        user.last_active = Some(at);
        Ok(())
    }

    async fn fetch_status(&self, user_id: &UserId) -> Result<PresenceRecord, PresenceError> {
        let user = self
            .users
            .get(user_id.as_str())
            .ok_or_else(|| PresenceError::UnknownUser(user_id.clone()))?;

        Ok(PresenceRecord {
            user_id: user.id.clone(),
            status: user.status,
            last_active_at: user.last_active,
        })
    }
}
