//! Staged, lock-holding change to one license.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use licensehub_core::error::AppError;
use licensehub_core::result::AppResult;
use licensehub_database::store::{ChangeSet, LedgerStore};
use licensehub_entity::license::{License, UpdateLicense};

/// A unit of work on one license, holding that license's lock.
///
/// Seat arithmetic happens on a staged copy of the license; allocation and
/// history writes are staged alongside it. Nothing reaches the store until
/// [`commit`](Self::commit). Dropping the transaction instead discards every
/// staged write and releases the lock.
#[derive(Debug)]
pub struct SeatTransaction {
    _guard: OwnedMutexGuard<()>,
    store: Arc<dyn LedgerStore>,
    original: License,
    license: License,
    changes: ChangeSet,
    deleted: bool,
    allow_capacity_below_usage: bool,
    now: DateTime<Utc>,
}

impl SeatTransaction {
    pub(crate) fn new(
        guard: OwnedMutexGuard<()>,
        store: Arc<dyn LedgerStore>,
        license: License,
        allow_capacity_below_usage: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            _guard: guard,
            store,
            original: license.clone(),
            license,
            changes: ChangeSet::new(),
            deleted: false,
            allow_capacity_below_usage,
            now,
        }
    }

    /// The license as staged so far.
    pub fn license(&self) -> &License {
        &self.license
    }

    /// The license as it was loaded.
    pub fn original(&self) -> &License {
        &self.original
    }

    /// Timestamp shared by every write in this transaction.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Staged allocation and history writes.
    pub fn changes(&mut self) -> &mut ChangeSet {
        &mut self.changes
    }

    /// Take `seats` more seats, or fail with `InsufficientSeats` leaving the
    /// staged license untouched.
    pub fn reserve(&mut self, seats: i32) -> AppResult<()> {
        if seats <= 0 {
            return Err(AppError::validation(format!(
                "Seats to reserve must be positive, got {seats}"
            )));
        }

        if !self.license.can_reserve(seats) {
            warn!(
                license_id = %self.license.id,
                requested = seats,
                available = self.license.available_seats(),
                "Seat reservation refused"
            );
            return Err(AppError::insufficient_seats(format!(
                "License {} has {} of {} seats available, {} requested",
                self.license.id,
                self.license.available_seats(),
                self.license.total_seats,
                seats
            )));
        }

        self.license.used_seats += seats;
        Ok(())
    }

    /// Give back `seats` seats. Usage never drops below zero.
    pub fn release(&mut self, seats: i32) {
        let seats = seats.max(0);
        if seats > self.license.used_seats {
            warn!(
                license_id = %self.license.id,
                requested = seats,
                used_seats = self.license.used_seats,
                "Release exceeds seats in use, clamping at zero"
            );
        }
        self.license.used_seats = (self.license.used_seats - seats).max(0);
    }

    /// Apply edited business attributes, including a capacity change.
    ///
    /// A capacity below current usage is a validation error unless the
    /// ledger allows over-committed licenses.
    pub fn apply(&mut self, update: &UpdateLicense) -> AppResult<()> {
        if update.total_seats <= 0 {
            return Err(AppError::validation("Total seats must be positive"));
        }

        if update.total_seats < self.license.used_seats {
            if !self.allow_capacity_below_usage {
                return Err(AppError::validation(format!(
                    "Total seats {} is below the {} seats in use",
                    update.total_seats, self.license.used_seats
                )));
            }
            warn!(
                license_id = %self.license.id,
                total_seats = update.total_seats,
                used_seats = self.license.used_seats,
                "Capacity reduced below usage; license is over-committed"
            );
        }

        self.license.software_name = update.software_name.trim().to_string();
        self.license.total_seats = update.total_seats;
        self.license.expiration_date = update.expiration_date;
        self.license.active = update.active;
        self.license.description = update.description.clone();
        Ok(())
    }

    /// Stage removal of the license and, with it, all of its allocations.
    pub fn delete(&mut self) {
        self.deleted = true;
    }

    /// Persist the staged license and every staged write in one change set.
    ///
    /// Returns the license as committed (or as it was before deletion).
    pub async fn commit(mut self) -> AppResult<License> {
        let expected_version = self.original.version;

        if self.deleted {
            self.changes
                .delete_license(self.license.id, expected_version);
        } else {
            self.license.version = expected_version + 1;
            self.license.updated_at = self.now;
            self.changes
                .update_license(self.license.clone(), expected_version);
        }

        self.store.commit(self.changes).await?;

        info!(
            license_id = %self.license.id,
            used_seats = self.license.used_seats,
            total_seats = self.license.total_seats,
            deleted = self.deleted,
            "Seat transaction committed"
        );

        Ok(self.license)
    }
}
