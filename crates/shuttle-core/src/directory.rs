//! User directory lookups.

use async_trait::async_trait;
use thiserror::Error;

use crate::user::{UserId, UserRecord};

/// Directory errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No live user with this identifier (absent or soft-deleted).
    #[error("User not found: {0}")]
    NotFound(UserId),

    /// The backing store could not be reached.
    #[error("User directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup of users by identifier.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch a user.
    ///
    /// Returns [`DirectoryError::NotFound`] for unknown or soft-deleted users.
    async fn fetch_user(&self, user_id: &UserId) -> Result<UserRecord, DirectoryError>;
}
