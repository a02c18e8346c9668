//! # licensehub-entity
//!
//! Domain entity models for LicenseHub. Every struct in this crate
//! represents a database table row or a domain value object. Table rows
//! derive `sqlx::FromRow` directly, except allocations whose tagged holder
//! is decoded through [`allocation::AllocationRow`].

pub mod allocation;
pub mod directory;
pub mod history;
pub mod license;
