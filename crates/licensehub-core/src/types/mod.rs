//! Core type definitions used across the LicenseHub workspace.

pub mod id;
pub mod pagination;

pub use id::*;
pub use pagination::{PageRequest, PageResponse, paginate};
