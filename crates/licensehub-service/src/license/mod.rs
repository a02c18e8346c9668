//! License lifecycle: create, update, delete, and reads.

pub mod service;

pub use service::LicenseService;
