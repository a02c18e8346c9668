//! Filtered-list queries understood by every store backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use licensehub_core::types::{GroupId, LicenseId, UserId};
use licensehub_entity::allocation::{Allocation, AllocationHolder, HolderKind};
use licensehub_entity::history::{ActionType, HistoryEntry};
use licensehub_entity::license::License;

/// Which licenses to list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LicenseQuery {
    /// Every license.
    All,
    /// Licenses flagged active.
    Active,
    /// Licenses flagged inactive.
    Inactive,
    /// Licenses with at least one free seat.
    Available,
    /// Licenses with no free seat.
    FullyUtilized,
    /// Licenses for a given software name (exact match).
    BySoftwareName(String),
    /// Licenses expiring within `[from, to]`.
    ExpiringBetween {
        /// Window start (inclusive).
        from: DateTime<Utc>,
        /// Window end (inclusive).
        to: DateTime<Utc>,
    },
    /// Licenses whose expiration date is before the given instant.
    ExpiredBefore(DateTime<Utc>),
}

impl LicenseQuery {
    /// Evaluate the query against a single license.
    pub fn matches(&self, license: &License) -> bool {
        match self {
            Self::All => true,
            Self::Active => license.active,
            Self::Inactive => !license.active,
            Self::Available => license.used_seats < license.total_seats,
            Self::FullyUtilized => license.used_seats >= license.total_seats,
            Self::BySoftwareName(name) => license.software_name == *name,
            Self::ExpiringBetween { from, to } => license
                .expiration_date
                .is_some_and(|expires| expires >= *from && expires <= *to),
            Self::ExpiredBefore(instant) => license
                .expiration_date
                .is_some_and(|expires| expires < *instant),
        }
    }
}

/// Which allocations to list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationQuery {
    /// Restrict to one license.
    pub license_id: Option<LicenseId>,
    /// Restrict to one user.
    pub user_id: Option<UserId>,
    /// Restrict to one group.
    pub group_id: Option<GroupId>,
    /// Restrict to one holder kind.
    pub holder_kind: Option<HolderKind>,
    /// Skip revoked allocations.
    pub active_only: bool,
}

impl AllocationQuery {
    /// Allocations drawn from one license.
    pub fn for_license(license_id: LicenseId) -> Self {
        Self {
            license_id: Some(license_id),
            ..Self::default()
        }
    }

    /// Allocations held by one principal.
    pub fn for_holder(holder: AllocationHolder) -> Self {
        Self {
            user_id: holder.user_id(),
            group_id: holder.group_id(),
            holder_kind: Some(holder.kind()),
            ..Self::default()
        }
    }

    /// Only user assignments.
    pub fn users(mut self) -> Self {
        self.holder_kind = Some(HolderKind::User);
        self
    }

    /// Only group allocations.
    pub fn groups(mut self) -> Self {
        self.holder_kind = Some(HolderKind::Group);
        self
    }

    /// Only active allocations.
    pub fn active(mut self) -> Self {
        self.active_only = true;
        self
    }

    /// Evaluate the query against a single allocation.
    pub fn matches(&self, allocation: &Allocation) -> bool {
        self.license_id.is_none_or(|id| allocation.license_id == id)
            && self
                .user_id
                .is_none_or(|id| allocation.holder.user_id() == Some(id))
            && self
                .group_id
                .is_none_or(|id| allocation.holder.group_id() == Some(id))
            && self
                .holder_kind
                .is_none_or(|kind| allocation.holder.kind() == kind)
            && (!self.active_only || allocation.is_active())
    }
}

/// History search criteria. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryFilter {
    /// Entries for one license.
    pub license_id: Option<LicenseId>,
    /// Entries involving one user.
    pub user_id: Option<UserId>,
    /// Entries involving one group.
    pub group_id: Option<GroupId>,
    /// Entries of one action type.
    pub action_type: Option<ActionType>,
    /// Entries at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Entries at or before this instant.
    pub to: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    /// Evaluate the filter against a single entry.
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        self.license_id.is_none_or(|id| entry.license_id == id)
            && self.user_id.is_none_or(|id| entry.involves_user(id))
            && self.group_id.is_none_or(|id| entry.involves_group(id))
            && self
                .action_type
                .is_none_or(|action| entry.action_type == action)
            && self.from.is_none_or(|from| entry.timestamp >= from)
            && self.to.is_none_or(|to| entry.timestamp <= to)
    }
}
