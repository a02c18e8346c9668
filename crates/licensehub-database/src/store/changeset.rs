//! Unit of work applied atomically by a [`super::LedgerStore`].

use chrono::{DateTime, Utc};

use licensehub_core::types::{AllocationId, LicenseId};
use licensehub_entity::allocation::Allocation;
use licensehub_entity::history::HistoryEntry;
use licensehub_entity::license::License;

/// A write to the licenses table.
#[derive(Debug, Clone)]
pub enum LicenseWrite {
    /// Insert a new license. Fails on a duplicate id or license key.
    Insert(License),
    /// Replace a license whose stored version equals `expected_version`.
    Update {
        /// New row contents, including the bumped version.
        license: License,
        /// Version the caller read.
        expected_version: i64,
    },
    /// Delete a license and, by ownership, all of its allocations.
    Delete {
        /// License to delete.
        id: LicenseId,
        /// Version the caller read.
        expected_version: i64,
    },
}

impl LicenseWrite {
    /// The license this write touches.
    pub fn license_id(&self) -> LicenseId {
        match self {
            Self::Insert(license) | Self::Update { license, .. } => license.id,
            Self::Delete { id, .. } => *id,
        }
    }
}

/// A write to the allocations table.
#[derive(Debug, Clone)]
pub enum AllocationWrite {
    /// Insert a new active allocation. Fails if the holder already has an
    /// active allocation on the same license.
    Insert(Allocation),
    /// Revoke an allocation. Fails unless it is currently active.
    Revoke {
        /// Allocation to revoke.
        id: AllocationId,
        /// Revocation time.
        revoked_at: DateTime<Utc>,
    },
}

/// Everything one ledger operation wants to persist.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    licenses: Vec<LicenseWrite>,
    allocations: Vec<AllocationWrite>,
    history: Vec<HistoryEntry>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a license insert.
    pub fn insert_license(&mut self, license: License) -> &mut Self {
        self.licenses.push(LicenseWrite::Insert(license));
        self
    }

    /// Stage a license update guarded by `expected_version`.
    pub fn update_license(&mut self, license: License, expected_version: i64) -> &mut Self {
        self.licenses.push(LicenseWrite::Update {
            license,
            expected_version,
        });
        self
    }

    /// Stage a license delete guarded by `expected_version`.
    pub fn delete_license(&mut self, id: LicenseId, expected_version: i64) -> &mut Self {
        self.licenses.push(LicenseWrite::Delete {
            id,
            expected_version,
        });
        self
    }

    /// Stage an allocation insert.
    pub fn insert_allocation(&mut self, allocation: Allocation) -> &mut Self {
        self.allocations.push(AllocationWrite::Insert(allocation));
        self
    }

    /// Stage an allocation revocation.
    pub fn revoke_allocation(&mut self, id: AllocationId, revoked_at: DateTime<Utc>) -> &mut Self {
        self.allocations
            .push(AllocationWrite::Revoke { id, revoked_at });
        self
    }

    /// Stage a history append.
    pub fn append_history(&mut self, entry: HistoryEntry) -> &mut Self {
        self.history.push(entry);
        self
    }

    /// Staged license writes, in order.
    pub fn license_writes(&self) -> &[LicenseWrite] {
        &self.licenses
    }

    /// Staged allocation writes, in order.
    pub fn allocation_writes(&self) -> &[AllocationWrite] {
        &self.allocations
    }

    /// Staged history entries, in order.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Split into license writes, allocation writes and history, in order.
    pub fn into_parts(self) -> (Vec<LicenseWrite>, Vec<AllocationWrite>, Vec<HistoryEntry>) {
        (self.licenses, self.allocations, self.history)
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.licenses.is_empty() && self.allocations.is_empty() && self.history.is_empty()
    }
}
