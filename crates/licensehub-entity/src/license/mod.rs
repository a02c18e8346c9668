//! License domain entities.

pub mod capacity;
pub mod model;

pub use capacity::{SeatState, SeatUsage};
pub use model::{CreateLicense, License, UpdateLicense};
