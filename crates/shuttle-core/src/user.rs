//! User records as seen by the location channel.
//!
//! Role-specific details are a tagged union resolved once at
//! deserialization, keyed by the `role` field.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::time::SystemTime;

use crate::presence::PresenceStatus;

/// Opaque user identifier taken from the upgrade path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a new user ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for UserId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// User roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    SuperAdmin,
    SchoolAdmin,
    Parent,
    Driver,
}

impl Role {
    /// Short role code used by the authorization layer.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SA",
            Role::SchoolAdmin => "AS",
            Role::Parent => "P",
            Role::Driver => "D",
        }
    }

    /// Parse a short role code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "SA" => Some(Role::SuperAdmin),
            "AS" => Some(Role::SchoolAdmin),
            "P" => Some(Role::Parent),
            "D" => Some(Role::Driver),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::SuperAdmin => "superadmin",
            Role::SchoolAdmin => "schooladmin",
            Role::Parent => "parent",
            Role::Driver => "driver",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

/// Personal details shared by every role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub picture: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolAdminDetails {
    /// School this admin manages.
    pub school_id: String,
    #[serde(flatten)]
    pub personal: PersonalDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverDetails {
    /// School the driver is assigned to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    /// Vehicle the driver is assigned to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub license_number: String,
    #[serde(flatten)]
    pub personal: PersonalDetails,
}

/// Role-specific details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RoleDetails {
    SuperAdmin(PersonalDetails),
    SchoolAdmin(SchoolAdminDetails),
    Parent(PersonalDetails),
    Driver(DriverDetails),
}

impl RoleDetails {
    /// The role these details belong to.
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            RoleDetails::SuperAdmin(_) => Role::SuperAdmin,
            RoleDetails::SchoolAdmin(_) => Role::SchoolAdmin,
            RoleDetails::Parent(_) => Role::Parent,
            RoleDetails::Driver(_) => Role::Driver,
        }
    }

    /// Personal details common to every role.
    #[must_use]
    pub fn personal(&self) -> &PersonalDetails {
        match self {
            RoleDetails::SuperAdmin(p) | RoleDetails::Parent(p) => p,
            RoleDetails::SchoolAdmin(d) => &d.personal,
            RoleDetails::Driver(d) => &d.personal,
        }
    }
}

/// A user as stored in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub details: RoleDetails,
    #[serde(default)]
    pub status: PresenceStatus,
    #[serde(skip)]
    pub last_active: Option<SystemTime>,
    #[serde(skip)]
    pub deleted_at: Option<SystemTime>,
}

impl UserRecord {
    /// Create a new user record.
    #[must_use]
    pub fn new(id: impl Into<UserId>, username: impl Into<String>, details: RoleDetails) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: String::new(),
            details,
            status: PresenceStatus::Offline,
            last_active: None,
            deleted_at: None,
        }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.details.role()
    }

    /// Check if the user was soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
