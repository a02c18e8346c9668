//! Who holds an allocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use licensehub_core::types::{GroupId, UserId};

/// Kind of principal holding an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "allocation_holder", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HolderKind {
    /// A single user holding exactly one seat.
    User,
    /// A group holding a block of seats.
    Group,
}

impl HolderKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }
}

impl fmt::Display for HolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HolderKind {
    type Err = licensehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            _ => Err(licensehub_core::AppError::validation(format!(
                "Invalid holder kind: '{s}'. Expected one of: user, group"
            ))),
        }
    }
}

/// The principal an allocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum AllocationHolder {
    /// A user assignment.
    User(UserId),
    /// A group allocation.
    Group(GroupId),
}

impl AllocationHolder {
    /// The holder's kind.
    pub fn kind(&self) -> HolderKind {
        match self {
            Self::User(_) => HolderKind::User,
            Self::Group(_) => HolderKind::Group,
        }
    }

    /// The user id, for user assignments.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Group(_) => None,
        }
    }

    /// The group id, for group allocations.
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Self::User(_) => None,
            Self::Group(id) => Some(*id),
        }
    }
}

impl fmt::Display for AllocationHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Group(id) => write!(f, "group:{id}"),
        }
    }
}
