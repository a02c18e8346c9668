//! Seat invariant verification.
//!
//! Detects drift between a license's `used_seats` counter and the seats held
//! by its active allocations. Read-only: drift is reported, never corrected.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use licensehub_core::error::ErrorKind;
use licensehub_core::result::AppResult;
use licensehub_core::types::LicenseId;
use licensehub_database::store::{AllocationQuery, LedgerStore, LicenseQuery};
use licensehub_entity::license::License;

use super::accountant::SeatAccountant;

/// Result of checking one license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatCheck {
    /// License checked.
    pub license_id: LicenseId,
    /// Software name, for reports.
    pub software_name: String,
    /// Seats purchased.
    pub total_seats: i32,
    /// The stored counter.
    pub used_seats: i32,
    /// Seats held by active allocations.
    pub allocated_seats: i32,
}

impl SeatCheck {
    /// Counter minus actual holdings.
    pub fn drift(&self) -> i32 {
        self.used_seats - self.allocated_seats
    }

    /// Whether the counter matches the holdings and fits the capacity.
    pub fn is_consistent(&self) -> bool {
        self.drift() == 0 && self.used_seats >= 0 && self.used_seats <= self.total_seats
    }
}

/// Recomputes seat usage from allocations.
#[derive(Debug, Clone)]
pub struct SeatVerifier {
    store: Arc<dyn LedgerStore>,
    accountant: SeatAccountant,
}

impl SeatVerifier {
    /// Creates a new seat verifier.
    pub fn new(accountant: SeatAccountant) -> Self {
        Self {
            store: Arc::clone(accountant.store()),
            accountant,
        }
    }

    /// Check one license under its lock.
    pub async fn verify_license(&self, license_id: LicenseId) -> AppResult<SeatCheck> {
        let (_guard, license) = self.accountant.lock_existing(license_id).await?;
        self.check(&license).await
    }

    /// Check every license. Returns one entry per license.
    pub async fn verify_all(&self) -> AppResult<Vec<SeatCheck>> {
        let licenses = self.store.list_licenses(&LicenseQuery::All).await?;
        let mut checks = Vec::with_capacity(licenses.len());

        for license in licenses {
            match self.verify_license(license.id).await {
                Ok(check) => checks.push(check),
                // Deleted since listing.
                Err(e) if e.is(ErrorKind::NotFound) => continue,
                Err(e) => return Err(e),
            }
        }

        let drifted = checks.iter().filter(|c| !c.is_consistent()).count();
        if drifted == 0 {
            info!(licenses = checks.len(), "Seat verification: all licenses consistent");
        } else {
            warn!(
                licenses = checks.len(),
                drifted = drifted,
                "Seat verification found inconsistent licenses"
            );
        }

        Ok(checks)
    }

    async fn check(&self, license: &License) -> AppResult<SeatCheck> {
        let allocations = self
            .store
            .list_allocations(&AllocationQuery::for_license(license.id).active())
            .await?;
        let allocated_seats = allocations.iter().map(|a| a.seats_held()).sum();

        let check = SeatCheck {
            license_id: license.id,
            software_name: license.software_name.clone(),
            total_seats: license.total_seats,
            used_seats: license.used_seats,
            allocated_seats,
        };

        if !check.is_consistent() {
            warn!(
                license_id = %license.id,
                used_seats = check.used_seats,
                allocated_seats = check.allocated_seats,
                total_seats = check.total_seats,
                delta = check.drift(),
                "Seat drift detected"
            );
        }

        Ok(check)
    }
}
