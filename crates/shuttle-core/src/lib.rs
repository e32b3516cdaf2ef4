//! # shuttle-core
//!
//! Core types for the shuttle location channel.
//!
//! - **Registry** - which user currently holds the live connection
//! - **Presence** - online/offline status persisted per user
//! - **Directory** - lookup of users by identifier
//! - **User** - user records with role-specific details
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Session   │────▶│  Registry   │     │  Directory  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       ▲
//!        └──────────────▶┌─────────────┐         │
//!                        │  Presence   │─────────┘
//!                        └─────────────┘   (MemoryStore)
//! ```

pub mod directory;
pub mod presence;
pub mod registry;
pub mod store;
pub mod user;

pub use directory::{DirectoryError, UserDirectory};
pub use presence::{PresenceError, PresenceRecord, PresenceStatus, PresenceStore};
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};
pub use store::MemoryStore;
pub use user::{
    DriverDetails, Gender, PersonalDetails, Role, RoleDetails, SchoolAdminDetails, UserId,
    UserRecord,
};
