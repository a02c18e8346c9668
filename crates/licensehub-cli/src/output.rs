//! Table and JSON output formatting for CLI commands.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::{Table, Tabled};

use licensehub_database::migration::MigrationStatus;
use licensehub_entity::allocation::Allocation;
use licensehub_entity::history::HistoryEntry;
use licensehub_entity::license::License;
use licensehub_service::SeatCheck;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                let table = Table::new(items).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a single item as JSON
pub fn print_json<T: Serialize>(item: &T) {
    let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
    println!("{}", json);
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{}:", key), value);
}

/// Print every attribute of one license.
pub fn print_license(license: &License, format: OutputFormat) {
    if format == OutputFormat::Json {
        print_json(license);
        return;
    }

    println!("License {}:", license.id);
    print_kv("Software", &license.software_name);
    print_kv("License Key", &license.license_key);
    print_kv("Total Seats", &license.total_seats.to_string());
    print_kv("Used Seats", &license.used_seats.to_string());
    print_kv("Available", &license.available_seats().to_string());
    print_kv("Usage", &format!("{:.1}%", license.usage().usage_percent));
    print_kv("State", &license.seat_state().to_string());
    print_kv("Expires", &date_or_dash(license.expiration_date));
    print_kv("Active", &license.active.to_string());
    print_kv(
        "Description",
        license.description.as_deref().unwrap_or("-"),
    );
    print_kv("Version", &license.version.to_string());
    print_kv("Updated", &license.updated_at.to_rfc3339());
}

/// License display row
#[derive(Debug, Serialize, Tabled)]
pub struct LicenseRow {
    /// License ID
    id: String,
    /// Software name
    software: String,
    /// License key
    key: String,
    /// Used / total
    seats: String,
    /// Free seats
    available: i32,
    /// Share of seats in use
    usage: String,
    /// Expiration date
    expires: String,
    /// Active flag
    active: bool,
}

impl From<&License> for LicenseRow {
    fn from(license: &License) -> Self {
        Self {
            id: license.id.to_string(),
            software: license.software_name.clone(),
            key: license.license_key.clone(),
            seats: format!("{}/{}", license.used_seats, license.total_seats),
            available: license.available_seats(),
            usage: format!("{:.0}%", license.usage().usage_percent),
            expires: date_or_dash(license.expiration_date),
            active: license.active,
        }
    }
}

/// Allocation display row
#[derive(Debug, Serialize, Tabled)]
pub struct AllocationRow {
    /// Allocation ID
    id: String,
    /// License ID
    license: String,
    /// `user` or `group`
    kind: String,
    /// Holder ID
    holder: String,
    /// Seats held
    seats: i32,
    /// Grant time
    granted: String,
    /// Revocation time
    revoked: String,
}

impl From<&Allocation> for AllocationRow {
    fn from(allocation: &Allocation) -> Self {
        let holder = allocation
            .holder
            .user_id()
            .map(|id| id.to_string())
            .or_else(|| allocation.holder.group_id().map(|id| id.to_string()))
            .unwrap_or_default();
        Self {
            id: allocation.id.to_string(),
            license: allocation.license_id.to_string(),
            kind: allocation.holder.kind().to_string(),
            holder,
            seats: allocation.seats,
            granted: time(allocation.granted_at),
            revoked: allocation.revoked_at.map(time).unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// History display row
#[derive(Debug, Serialize, Tabled)]
pub struct HistoryRow {
    /// Time
    time: String,
    /// Action
    action: String,
    /// Description
    description: String,
    /// Details
    details: String,
    /// Actor
    performed_by: String,
}

impl From<&HistoryEntry> for HistoryRow {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            time: time(entry.timestamp),
            action: entry.action_type.to_string(),
            description: entry.description.clone(),
            details: entry.details.clone().unwrap_or_default(),
            performed_by: entry.performed_by.clone(),
        }
    }
}

/// Seat verification display row
#[derive(Debug, Serialize, Tabled)]
pub struct SeatCheckRow {
    /// License ID
    license: String,
    /// Software name
    software: String,
    /// Seats purchased
    total: i32,
    /// Stored counter
    used: i32,
    /// Seats held by active allocations
    allocated: i32,
    /// Counter minus holdings
    drift: i32,
    /// Verdict
    status: String,
}

impl From<&SeatCheck> for SeatCheckRow {
    fn from(check: &SeatCheck) -> Self {
        Self {
            license: check.license_id.to_string(),
            software: check.software_name.clone(),
            total: check.total_seats,
            used: check.used_seats,
            allocated: check.allocated_seats,
            drift: check.drift(),
            status: if check.is_consistent() { "ok" } else { "DRIFT" }.to_string(),
        }
    }
}

/// Schema migration display row
#[derive(Debug, Serialize, Tabled)]
pub struct MigrationRow {
    /// Migration version
    version: i64,
    /// Migration name
    description: String,
    /// `applied` or `pending`
    status: String,
}

impl From<&MigrationStatus> for MigrationRow {
    fn from(migration: &MigrationStatus) -> Self {
        Self {
            version: migration.version,
            description: migration.description.clone(),
            status: if migration.applied { "applied" } else { "pending" }.to_string(),
        }
    }
}

fn time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn date_or_dash(at: Option<DateTime<Utc>>) -> String {
    at.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}
