//! License entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use licensehub_core::types::LicenseId;

use super::capacity::{SeatState, SeatUsage};

/// A purchased software entitlement with a finite number of seats.
///
/// `used_seats` is an accounting field: it is only ever changed by the seat
/// accountant and always equals the seats held by the license's active
/// allocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct License {
    /// Unique license identifier.
    pub id: LicenseId,
    /// Name of the licensed software.
    pub software_name: String,
    /// Vendor license key. Globally unique and immutable.
    pub license_key: String,
    /// Seats purchased.
    pub total_seats: i32,
    /// Seats currently consumed by active allocations.
    pub used_seats: i32,
    /// When the entitlement expires, if ever.
    pub expiration_date: Option<DateTime<Utc>>,
    /// Informational flag; does not block allocation.
    pub active: bool,
    /// Free-form description.
    pub description: Option<String>,
    /// Optimistic concurrency version, bumped on every write.
    pub version: i64,
    /// When the license was created.
    pub created_at: DateTime<Utc>,
    /// When the license was last updated.
    pub updated_at: DateTime<Utc>,
}

impl License {
    /// Build a new license with no seats in use.
    pub fn new(data: CreateLicense, now: DateTime<Utc>) -> Self {
        Self {
            id: LicenseId::new(),
            software_name: data.software_name.trim().to_string(),
            license_key: data.license_key.trim().to_string(),
            total_seats: data.total_seats,
            used_seats: 0,
            expiration_date: data.expiration_date,
            active: data.active,
            description: data.description,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Seats that can still be reserved. Never negative.
    pub fn available_seats(&self) -> i32 {
        (self.total_seats - self.used_seats).max(0)
    }

    /// Whether `seats` more seats fit within the total.
    pub fn can_reserve(&self, seats: i32) -> bool {
        seats > 0
            && self
                .used_seats
                .checked_add(seats)
                .is_some_and(|after| after <= self.total_seats)
    }

    /// Whether usage exceeds capacity (only possible after a permitted
    /// capacity reduction below usage).
    pub fn is_over_committed(&self) -> bool {
        self.used_seats > self.total_seats
    }

    /// Whether the license has passed its expiration date.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date.is_some_and(|expires| expires <= now)
    }

    /// Position in the `Available` / `Full` state machine.
    pub fn seat_state(&self) -> SeatState {
        if self.used_seats >= self.total_seats {
            SeatState::Full
        } else {
            SeatState::Available
        }
    }

    /// Snapshot of the seat counters.
    pub fn usage(&self) -> SeatUsage {
        SeatUsage::new(self.total_seats, self.used_seats)
    }
}

/// Data required to create a new license.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLicense {
    /// Name of the licensed software.
    #[validate(length(min = 1, max = 255, message = "Software name is required"))]
    pub software_name: String,
    /// Vendor license key.
    #[validate(length(min = 1, max = 255, message = "License key is required"))]
    pub license_key: String,
    /// Seats purchased.
    #[validate(range(min = 1, message = "Total seats must be positive"))]
    pub total_seats: i32,
    /// Expiration date.
    pub expiration_date: Option<DateTime<Utc>>,
    /// Informational active flag.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Description.
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Editable business attributes of a license.
///
/// `license_key` and `used_seats` are deliberately absent: they are identity
/// and accounting fields, not editable attributes.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateLicense {
    /// Name of the licensed software.
    #[validate(length(min = 1, max = 255, message = "Software name is required"))]
    pub software_name: String,
    /// Seats purchased.
    #[validate(range(min = 1, message = "Total seats must be positive"))]
    pub total_seats: i32,
    /// Expiration date.
    pub expiration_date: Option<DateTime<Utc>>,
    /// Informational active flag.
    pub active: bool,
    /// Description.
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

impl UpdateLicense {
    /// Start an update from the license's current attributes.
    pub fn from_license(license: &License) -> Self {
        Self {
            software_name: license.software_name.clone(),
            total_seats: license.total_seats,
            expiration_date: license.expiration_date,
            active: license.active,
            description: license.description.clone(),
        }
    }
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn license(total: i32, used: i32) -> License {
        let mut license = License::new(
            CreateLicense {
                software_name: "CAD Suite".to_string(),
                license_key: "CAD-001".to_string(),
                total_seats: total,
                expiration_date: None,
                active: true,
                description: None,
            },
            Utc::now(),
        );
        license.used_seats = used;
        license
    }

    #[test]
    fn test_can_reserve_respects_capacity() {
        let lic = license(10, 3);
        assert!(lic.can_reserve(7));
        assert!(!lic.can_reserve(8));
        assert!(!lic.can_reserve(0));
        assert!(!lic.can_reserve(-1));
    }

    #[test]
    fn test_available_seats_never_negative() {
        let lic = license(2, 5);
        assert_eq!(lic.available_seats(), 0);
        assert!(lic.is_over_committed());
        assert_eq!(lic.seat_state(), SeatState::Full);
    }

    #[test]
    fn test_seat_state_transitions() {
        let mut lic = license(1, 0);
        assert_eq!(lic.seat_state(), SeatState::Available);
        lic.used_seats = 1;
        assert_eq!(lic.seat_state(), SeatState::Full);
    }

    #[test]
    fn test_new_trims_identity_fields() {
        let lic = License::new(
            CreateLicense {
                software_name: "  Office ".to_string(),
                license_key: " KEY-1 ".to_string(),
                total_seats: 5,
                expiration_date: None,
                active: true,
                description: None,
            },
            Utc::now(),
        );
        assert_eq!(lic.software_name, "Office");
        assert_eq!(lic.license_key, "KEY-1");
        assert_eq!(lic.used_seats, 0);
        assert_eq!(lic.version, 0);
    }

    #[test]
    fn test_create_validation() {
        let data = CreateLicense {
            software_name: String::new(),
            license_key: "K".to_string(),
            total_seats: 0,
            expiration_date: None,
            active: true,
            description: None,
        };
        let errors = data.validate().expect_err("should be invalid");
        let fields = errors.field_errors();
        assert!(fields.contains_key("software_name"));
        assert!(fields.contains_key("total_seats"));
    }
}
