//! Caller profile: role and activation flag.

use std::str::FromStr;

use serde::Serialize;

use super::booking::UnknownVariant;
use super::ids::UserId;

/// Platform role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular employee.
    Learner,
    /// Platform administrator; bypasses ownership and cutoff rules.
    Admin,
}

impl Role {
    /// Database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Learner => "learner",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learner" | "user" => Ok(Self::Learner),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// The subset of a user profile the service cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Owner of the profile.
    pub user_id: UserId,
    /// Role.
    pub role: Role,
    /// Deactivated users may not book or earn points.
    pub is_active: bool,
}

impl Profile {
    /// `true` for administrators.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}
