//! # licensehub-service
//!
//! The seat allocation and audit engine. Services follow constructor
//! injection: the store, directory, and seat accountant are provided at
//! construction time and shared through `Arc`.
//!
//! Every mutating operation follows the same shape: lock the license through
//! the [`seat::SeatAccountant`], stage seat arithmetic, allocation writes,
//! and history entries on a [`seat::SeatTransaction`], then commit them as
//! one change set.

pub mod assignment;
pub mod audit;
pub mod context;
pub mod ledger;
pub mod license;
pub mod seat;

pub use assignment::{AssignGroupRequest, AssignUserRequest, AssignmentService};
pub use audit::AuditRecorder;
pub use context::RequestContext;
pub use ledger::Ledger;
pub use license::LicenseService;
pub use seat::{SeatAccountant, SeatCheck, SeatTransaction, SeatVerifier};
