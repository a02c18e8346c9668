//! History entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use licensehub_core::types::{GroupId, HistoryEntryId, LicenseId, UserId};

use super::action::ActionType;

/// An immutable record of one license mutation.
///
/// Entries are written in the same unit of work as the change they
/// describe and are never updated or deleted, not even when the license
/// itself is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct HistoryEntry {
    /// Unique, time-ordered entry identifier.
    pub id: HistoryEntryId,
    /// License the action applied to.
    pub license_id: LicenseId,
    /// User involved, if any.
    pub user_id: Option<UserId>,
    /// Group involved, if any.
    pub group_id: Option<GroupId>,
    /// What happened.
    pub action_type: ActionType,
    /// Human-readable summary.
    pub description: String,
    /// Free-form details.
    pub details: Option<String>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Who did it.
    pub performed_by: String,
}

impl HistoryEntry {
    /// Start an entry with no user, group, or details.
    pub fn new(
        license_id: LicenseId,
        action_type: ActionType,
        description: impl Into<String>,
        performed_by: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HistoryEntryId::new(),
            license_id,
            user_id: None,
            group_id: None,
            action_type,
            description: description.into(),
            details: None,
            timestamp,
            performed_by: performed_by.into(),
        }
    }

    /// Attach the user involved.
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attach the group involved.
    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// Attach free-form details.
    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }

    /// Whether this entry involves the given user.
    pub fn involves_user(&self, user_id: UserId) -> bool {
        self.user_id == Some(user_id)
    }

    /// Whether this entry involves the given group.
    pub fn involves_group(&self, group_id: GroupId) -> bool {
        self.group_id == Some(group_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_principals() {
        let user = UserId::new();
        let entry = HistoryEntry::new(
            LicenseId::new(),
            ActionType::LicenseAssignedToUser,
            "License assigned to user: alice",
            "admin",
            Utc::now(),
        )
        .with_user(user)
        .with_details(Some("onboarding".to_string()));

        assert!(entry.involves_user(user));
        assert!(!entry.involves_group(GroupId::new()));
        assert_eq!(entry.details.as_deref(), Some("onboarding"));
        assert_eq!(entry.performed_by, "admin");
    }
}
