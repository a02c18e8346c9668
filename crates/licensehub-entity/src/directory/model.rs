//! Directory principal models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use licensehub_core::types::{GroupId, UserId};

/// A user known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DirectoryUser {
    /// User identifier.
    pub id: UserId,
    /// Login name, used in history descriptions.
    pub username: String,
    /// Whether the account is active.
    pub active: bool,
}

/// A group known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DirectoryGroup {
    /// Group identifier.
    pub id: GroupId,
    /// Unique group name, used in history descriptions.
    pub name: String,
    /// Whether the group is active.
    pub active: bool,
}
