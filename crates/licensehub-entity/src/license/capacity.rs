//! Seat capacity value types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a license sits in its seat state machine.
///
/// Reserve moves `Available` towards `Full`, release moves it back;
/// capacity edits can move it either way without any allocation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    /// At least one seat can be reserved.
    Available,
    /// No seat can be reserved.
    Full,
}

impl fmt::Display for SeatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Snapshot of a license's seat counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeatUsage {
    /// Seats purchased.
    pub total_seats: i32,
    /// Seats consumed.
    pub used_seats: i32,
    /// Seats still reservable.
    pub available_seats: i32,
    /// Usage as a percentage of capacity.
    pub usage_percent: f64,
}

impl SeatUsage {
    /// Build a usage snapshot from raw counters.
    pub fn new(total_seats: i32, used_seats: i32) -> Self {
        let usage_percent = if total_seats > 0 {
            f64::from(used_seats) * 100.0 / f64::from(total_seats)
        } else {
            0.0
        };
        Self {
            total_seats,
            used_seats,
            available_seats: (total_seats - used_seats).max(0),
            usage_percent,
        }
    }

    /// Check if usage is at or above the given threshold.
    pub fn is_at_least(&self, threshold_percent: u8) -> bool {
        self.usage_percent >= f64::from(threshold_percent)
    }
}
