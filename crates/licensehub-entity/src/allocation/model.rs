//! Allocation entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use licensehub_core::AppError;
use licensehub_core::types::{AllocationId, GroupId, LicenseId, UserId};

use super::holder::{AllocationHolder, HolderKind};

/// A claim on seats of one license, held by a user (one seat) or a group
/// (a block of seats).
///
/// A record is active until `revoked_at` is set. It is never reactivated;
/// a new grant after revocation creates a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Unique allocation identifier.
    pub id: AllocationId,
    /// License the seats are drawn from.
    pub license_id: LicenseId,
    /// Who holds the seats.
    pub holder: AllocationHolder,
    /// Seats consumed while active. Always 1 for users.
    pub seats: i32,
    /// When the allocation was granted.
    pub granted_at: DateTime<Utc>,
    /// When the allocation was revoked (None = still active).
    pub revoked_at: Option<DateTime<Utc>>,
    /// Free-form notes supplied with the grant.
    pub notes: Option<String>,
}

impl Allocation {
    /// Grant a new active allocation.
    pub fn grant(
        license_id: LicenseId,
        holder: AllocationHolder,
        seats: i32,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AllocationId::new(),
            license_id,
            holder,
            seats,
            granted_at: now,
            revoked_at: None,
            notes,
        }
    }

    /// Whether this allocation currently consumes seats.
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }

    /// Seats this allocation contributes to the license's usage right now.
    pub fn seats_held(&self) -> i32 {
        if self.is_active() { self.seats } else { 0 }
    }

    /// Mark the allocation revoked.
    pub fn revoke(&mut self, now: DateTime<Utc>) {
        self.revoked_at = Some(now);
    }
}

/// Flat database row for an allocation.
#[derive(Debug, Clone, FromRow)]
pub struct AllocationRow {
    /// Unique allocation identifier.
    pub id: AllocationId,
    /// License the seats are drawn from.
    pub license_id: LicenseId,
    /// Holder discriminator.
    pub holder_kind: HolderKind,
    /// Set when `holder_kind = 'user'`.
    pub user_id: Option<UserId>,
    /// Set when `holder_kind = 'group'`.
    pub group_id: Option<GroupId>,
    /// Seats consumed while active.
    pub seats: i32,
    /// When the allocation was granted.
    pub granted_at: DateTime<Utc>,
    /// When the allocation was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Notes.
    pub notes: Option<String>,
}

impl TryFrom<AllocationRow> for Allocation {
    type Error = AppError;

    fn try_from(row: AllocationRow) -> Result<Self, Self::Error> {
        let holder = match (row.holder_kind, row.user_id, row.group_id) {
            (HolderKind::User, Some(user_id), None) => AllocationHolder::User(user_id),
            (HolderKind::Group, None, Some(group_id)) => AllocationHolder::Group(group_id),
            (kind, _, _) => {
                return Err(AppError::internal(format!(
                    "Allocation {} has inconsistent {kind} holder columns",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: row.id,
            license_id: row.license_id,
            holder,
            seats: row.seats,
            granted_at: row.granted_at,
            revoked_at: row.revoked_at,
            notes: row.notes,
        })
    }
}

impl From<&Allocation> for AllocationRow {
    fn from(allocation: &Allocation) -> Self {
        Self {
            id: allocation.id,
            license_id: allocation.license_id,
            holder_kind: allocation.holder.kind(),
            user_id: allocation.holder.user_id(),
            group_id: allocation.holder.group_id(),
            seats: allocation.seats,
            granted_at: allocation.granted_at,
            revoked_at: allocation.revoked_at,
            notes: allocation.notes.clone(),
        }
    }
}
