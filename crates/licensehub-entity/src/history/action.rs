//! History action types.
//!
//! The set of action types is a closed boundary contract: reporting tools
//! read the stored names, so variants are never renamed or removed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "license_action", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// A license was created.
    LicenseCreated,
    /// A license's attributes were edited.
    LicenseUpdated,
    /// A license and all of its allocations were removed.
    LicenseDeleted,
    /// A seat was assigned to a user.
    LicenseAssignedToUser,
    /// A user's seat was revoked.
    LicenseRevokedFromUser,
    /// A block of seats was allocated to a group.
    LicenseAssignedToGroup,
    /// A group's block of seats was revoked.
    LicenseRevokedFromGroup,
    /// Reserved.
    GroupAllocationIncreased,
    /// Reserved.
    GroupAllocationDecreased,
    /// Reserved.
    LicenseExpired,
    /// Reserved.
    LicenseRenewed,
    /// A license's total seats went up.
    SeatsIncreased,
    /// A license's total seats went down.
    SeatsDecreased,
}

impl ActionType {
    /// Every action type, in declaration order.
    pub const ALL: [ActionType; 13] = [
        Self::LicenseCreated,
        Self::LicenseUpdated,
        Self::LicenseDeleted,
        Self::LicenseAssignedToUser,
        Self::LicenseRevokedFromUser,
        Self::LicenseAssignedToGroup,
        Self::LicenseRevokedFromGroup,
        Self::GroupAllocationIncreased,
        Self::GroupAllocationDecreased,
        Self::LicenseExpired,
        Self::LicenseRenewed,
        Self::SeatsIncreased,
        Self::SeatsDecreased,
    ];

    /// Return the stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LicenseCreated => "LICENSE_CREATED",
            Self::LicenseUpdated => "LICENSE_UPDATED",
            Self::LicenseDeleted => "LICENSE_DELETED",
            Self::LicenseAssignedToUser => "LICENSE_ASSIGNED_TO_USER",
            Self::LicenseRevokedFromUser => "LICENSE_REVOKED_FROM_USER",
            Self::LicenseAssignedToGroup => "LICENSE_ASSIGNED_TO_GROUP",
            Self::LicenseRevokedFromGroup => "LICENSE_REVOKED_FROM_GROUP",
            Self::GroupAllocationIncreased => "GROUP_ALLOCATION_INCREASED",
            Self::GroupAllocationDecreased => "GROUP_ALLOCATION_DECREASED",
            Self::LicenseExpired => "LICENSE_EXPIRED",
            Self::LicenseRenewed => "LICENSE_RENEWED",
            Self::SeatsIncreased => "SEATS_INCREASED",
            Self::SeatsDecreased => "SEATS_DECREASED",
        }
    }

    /// Whether this action is reserved and never emitted by the ledger today.
    pub fn is_reserved(&self) -> bool {
        matches!(
            self,
            Self::GroupAllocationIncreased
                | Self::GroupAllocationDecreased
                | Self::LicenseExpired
                | Self::LicenseRenewed
        )
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = licensehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == wanted)
            .ok_or_else(|| {
                licensehub_core::AppError::validation(format!("Invalid action type: '{s}'"))
            })
    }
}
