//! Resource store trait and shared types.

pub mod changeset;
pub mod memory;
pub mod postgres;
pub mod query;

use async_trait::async_trait;

use licensehub_core::result::AppResult;
use licensehub_core::types::pagination::{PageRequest, PageResponse};
use licensehub_core::types::{AllocationId, LicenseId};
use licensehub_entity::allocation::{Allocation, AllocationHolder};
use licensehub_entity::history::HistoryEntry;
use licensehub_entity::license::License;

pub use changeset::{AllocationWrite, ChangeSet, LicenseWrite};
pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;
pub use query::{AllocationQuery, HistoryFilter, LicenseQuery};

/// Persistence for licenses, allocations, and history.
///
/// Implementations must apply a [`ChangeSet`] atomically: either every
/// write in it becomes visible or none does. Serialization of concurrent
/// writers to the same license is the caller's job (see the seat
/// accountant); the expected-version check in [`LicenseWrite`] is the
/// store's last line of defence against lost updates.
#[async_trait]
pub trait LedgerStore: Send + Sync + std::fmt::Debug {
    /// Find a license by id.
    async fn find_license(&self, id: LicenseId) -> AppResult<Option<License>>;

    /// Find a license by its vendor key.
    async fn find_license_by_key(&self, license_key: &str) -> AppResult<Option<License>>;

    /// Whether a license with this key exists.
    async fn license_key_exists(&self, license_key: &str) -> AppResult<bool>;

    /// List licenses matching a query, ordered by software name.
    async fn list_licenses(&self, query: &LicenseQuery) -> AppResult<Vec<License>>;

    /// Find an allocation by id.
    async fn find_allocation(&self, id: AllocationId) -> AppResult<Option<Allocation>>;

    /// Find the active allocation of `holder` on `license_id`, if any.
    async fn find_active_allocation(
        &self,
        license_id: LicenseId,
        holder: &AllocationHolder,
    ) -> AppResult<Option<Allocation>>;

    /// List allocations matching a query, oldest grant first.
    async fn list_allocations(&self, query: &AllocationQuery) -> AppResult<Vec<Allocation>>;

    /// Search history, newest first.
    async fn search_history(
        &self,
        filter: &HistoryFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<HistoryEntry>>;

    /// Apply every write in `changes`, or none of them.
    async fn commit(&self, changes: ChangeSet) -> AppResult<()>;

    /// Check that the store backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
