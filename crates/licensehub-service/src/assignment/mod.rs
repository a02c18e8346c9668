//! Seat assignments to users and groups.

pub mod service;

pub use service::{AssignGroupRequest, AssignUserRequest, AssignmentService};
