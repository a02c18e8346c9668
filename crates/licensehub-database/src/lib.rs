//! # licensehub-database
//!
//! The resource store behind the seat ledger. Reads are plain lookups and
//! filtered lists; every write goes through [`store::LedgerStore::commit`],
//! which applies a [`store::ChangeSet`] all-or-nothing.
//!
//! Two backends are provided:
//! - [`store::MemoryLedgerStore`] (single process, used by tests)
//! - [`store::PgLedgerStore`] (PostgreSQL via sqlx)

pub mod backend;
pub mod connection;
pub mod directory;
pub mod migration;
pub mod store;

pub use backend::LedgerBackend;
pub use connection::DatabasePool;
pub use directory::{Directory, MemoryDirectory, PgDirectory};
pub use store::{
    AllocationQuery, AllocationWrite, ChangeSet, HistoryFilter, LedgerStore, LicenseQuery,
    LicenseWrite, MemoryLedgerStore, PgLedgerStore,
};
