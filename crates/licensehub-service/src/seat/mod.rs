//! Seat accounting: the only code that changes a license's `used_seats`.

pub mod accountant;
pub mod transaction;
pub mod verifier;

pub use accountant::SeatAccountant;
pub use transaction::SeatTransaction;
pub use verifier::{SeatCheck, SeatVerifier};
