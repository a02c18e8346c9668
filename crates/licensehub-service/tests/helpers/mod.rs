//! Shared helpers for ledger integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use licensehub_core::config::LedgerConfig;
use licensehub_core::error::AppError;
use licensehub_core::result::AppResult;
use licensehub_core::types::pagination::{PageRequest, PageResponse};
use licensehub_core::types::{AllocationId, GroupId, LicenseId, UserId};
use licensehub_database::store::{
    AllocationQuery, ChangeSet, HistoryFilter, LedgerStore, LicenseQuery, MemoryLedgerStore,
};
use licensehub_database::{LedgerBackend, MemoryDirectory};
use licensehub_entity::allocation::{Allocation, AllocationHolder};
use licensehub_entity::history::HistoryEntry;
use licensehub_entity::license::{CreateLicense, License};
use licensehub_service::{
    AssignGroupRequest, AssignUserRequest, Ledger, RequestContext,
};

/// A ledger over in-memory tables, with handles on the raw store.
pub struct TestLedger {
    /// Services under test.
    pub ledger: Ledger,
    /// Underlying store, wrapped so commits can be made to fail.
    pub store: Arc<FailingStore>,
    /// Directory to register users and groups in.
    pub directory: Arc<MemoryDirectory>,
}

impl TestLedger {
    /// Ledger with default policy.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Ledger with a custom policy.
    pub fn with_config(config: LedgerConfig) -> Self {
        let store = Arc::new(FailingStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        let backend = LedgerBackend::from_parts(store.clone(), directory.clone());
        Self {
            ledger: Ledger::new(backend, &config),
            store,
            directory,
        }
    }

    /// Context for the test administrator.
    pub fn ctx(&self) -> RequestContext {
        RequestContext::new("admin")
    }

    /// Create a license with `total` seats.
    pub async fn license(&self, name: &str, total: i32) -> License {
        self.ledger
            .licenses()
            .create(&self.ctx(), create_request(name, total))
            .await
            .expect("create license")
    }

    /// Assign a fresh user to a license.
    pub async fn assign_new_user(&self, license_id: LicenseId, username: &str) -> Allocation {
        let user_id = self.directory.add_user(username);
        self.assign_user(license_id, user_id)
            .await
            .expect("assign user")
    }

    /// Assign an existing user to a license.
    pub async fn assign_user(
        &self,
        license_id: LicenseId,
        user_id: UserId,
    ) -> AppResult<Allocation> {
        self.ledger
            .assignments()
            .assign_to_user(
                &self.ctx(),
                AssignUserRequest {
                    license_id,
                    user_id,
                    notes: None,
                },
            )
            .await
    }

    /// Allocate seats to an existing group.
    pub async fn assign_group(
        &self,
        license_id: LicenseId,
        group_id: GroupId,
        seats: i32,
    ) -> AppResult<Allocation> {
        self.ledger
            .assignments()
            .assign_to_group(
                &self.ctx(),
                AssignGroupRequest {
                    license_id,
                    group_id,
                    seats,
                    notes: None,
                },
            )
            .await
    }

    /// Reload a license.
    pub async fn reload(&self, license_id: LicenseId) -> License {
        self.ledger
            .licenses()
            .get(license_id)
            .await
            .expect("reload license")
    }

    /// Every history entry for a license, newest first.
    pub async fn history(&self, license_id: LicenseId) -> Vec<HistoryEntry> {
        self.ledger
            .audit()
            .for_license(license_id, &PageRequest::new(1, 100))
            .await
            .expect("history")
            .items
    }

    /// Assert `0 <= used <= total` and `used == Σ active seats`.
    pub async fn assert_seat_invariant(&self, license_id: LicenseId) {
        let license = self.reload(license_id).await;
        let held: i32 = self
            .store
            .list_allocations(&AllocationQuery::for_license(license_id).active())
            .await
            .expect("list allocations")
            .iter()
            .map(Allocation::seats_held)
            .sum();
        assert!(license.used_seats >= 0, "negative usage: {license:?}");
        assert!(
            license.used_seats <= license.total_seats,
            "usage above capacity: {license:?}"
        );
        assert_eq!(license.used_seats, held, "counter drifted from allocations");
    }
}

/// Build a create request.
pub fn create_request(name: &str, total: i32) -> CreateLicense {
    CreateLicense {
        software_name: name.to_string(),
        license_key: format!("{name}-{}", LicenseId::new()),
        total_seats: total,
        expiration_date: None,
        active: true,
        description: None,
    }
}

/// In-memory store whose commits can be switched to fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryLedgerStore,
    fail_commits: AtomicBool,
}

impl FailingStore {
    /// Create a store that commits normally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following commit fail (or succeed again).
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Write a license row directly, bypassing the ledger.
    pub async fn overwrite_license(&self, mut license: License) {
        let expected = license.version;
        license.version += 1;
        let mut changes = ChangeSet::new();
        changes.update_license(license, expected);
        self.inner.commit(changes).await.expect("overwrite license");
    }

    /// Number of history entries stored.
    pub async fn history_len(&self) -> usize {
        self.inner.history_len().await
    }
}

#[async_trait]
impl LedgerStore for FailingStore {
    async fn find_license(&self, id: LicenseId) -> AppResult<Option<License>> {
        self.inner.find_license(id).await
    }

    async fn find_license_by_key(&self, license_key: &str) -> AppResult<Option<License>> {
        self.inner.find_license_by_key(license_key).await
    }

    async fn license_key_exists(&self, license_key: &str) -> AppResult<bool> {
        self.inner.license_key_exists(license_key).await
    }

    async fn list_licenses(&self, query: &LicenseQuery) -> AppResult<Vec<License>> {
        self.inner.list_licenses(query).await
    }

    async fn find_allocation(&self, id: AllocationId) -> AppResult<Option<Allocation>> {
        self.inner.find_allocation(id).await
    }

    async fn find_active_allocation(
        &self,
        license_id: LicenseId,
        holder: &AllocationHolder,
    ) -> AppResult<Option<Allocation>> {
        self.inner.find_active_allocation(license_id, holder).await
    }

    async fn list_allocations(&self, query: &AllocationQuery) -> AppResult<Vec<Allocation>> {
        self.inner.list_allocations(query).await
    }

    async fn search_history(
        &self,
        filter: &HistoryFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<HistoryEntry>> {
        self.inner.search_history(filter, page).await
    }

    async fn commit(&self, changes: ChangeSet) -> AppResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(AppError::database("Injected commit failure"));
        }
        self.inner.commit(changes).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
