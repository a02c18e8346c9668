//! Process-local store backed by in-memory tables.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use licensehub_core::error::AppError;
use licensehub_core::result::AppResult;
use licensehub_core::types::pagination::{PageRequest, PageResponse, paginate};
use licensehub_core::types::{AllocationId, HistoryEntryId, LicenseId};
use licensehub_entity::allocation::{Allocation, AllocationHolder};
use licensehub_entity::history::HistoryEntry;
use licensehub_entity::license::License;

use super::changeset::{AllocationWrite, ChangeSet, LicenseWrite};
use super::query::{AllocationQuery, HistoryFilter, LicenseQuery};
use super::LedgerStore;

#[derive(Debug, Default)]
struct Tables {
    licenses: HashMap<LicenseId, License>,
    license_keys: HashMap<String, LicenseId>,
    allocations: HashMap<AllocationId, Allocation>,
    active: HashMap<(LicenseId, AllocationHolder), AllocationId>,
    history: Vec<HistoryEntry>,
    history_ids: HashSet<HistoryEntryId>,
}

impl Tables {
    fn apply_license(&mut self, write: LicenseWrite) {
        match write {
            LicenseWrite::Insert(license) => {
                self.license_keys
                    .insert(license.license_key.clone(), license.id);
                self.licenses.insert(license.id, license);
            }
            LicenseWrite::Update { license, .. } => {
                let id = license.id;
                let key = license.license_key.clone();
                if let Some(previous) = self.licenses.insert(id, license) {
                    if previous.license_key != key
                        && self.license_keys.get(&previous.license_key) == Some(&id)
                    {
                        self.license_keys.remove(&previous.license_key);
                    }
                }
                self.license_keys.insert(key, id);
            }
            LicenseWrite::Delete { id, .. } => {
                if let Some(license) = self.licenses.remove(&id) {
                    self.license_keys.remove(&license.license_key);
                }
                self.allocations
                    .retain(|_, allocation| allocation.license_id != id);
                self.active.retain(|(license_id, _), _| *license_id != id);
            }
        }
    }

    fn apply_allocation(&mut self, write: AllocationWrite) {
        match write {
            AllocationWrite::Insert(allocation) => {
                if allocation.is_active() {
                    self.active
                        .insert((allocation.license_id, allocation.holder), allocation.id);
                }
                self.allocations.insert(allocation.id, allocation);
            }
            AllocationWrite::Revoke { id, revoked_at } => {
                if let Some(allocation) = self.allocations.get_mut(&id) {
                    allocation.revoke(revoked_at);
                    self.active
                        .remove(&(allocation.license_id, allocation.holder));
                }
            }
        }
    }

    fn append_history(&mut self, entry: HistoryEntry) {
        self.history_ids.insert(entry.id);
        self.history.push(entry);
    }

    fn key_taken(&self, license_key: &str) -> bool {
        self.license_keys.contains_key(license_key)
    }

    fn active_allocation(
        &self,
        license_id: LicenseId,
        holder: &AllocationHolder,
    ) -> Option<&Allocation> {
        self.active
            .get(&(license_id, *holder))
            .and_then(|id| self.allocations.get(id))
    }
}

#[derive(Debug)]
struct StagedLicense {
    version: i64,
    license_key: String,
}

#[derive(Debug, Clone, Copy)]
struct StagedAllocation {
    license_id: LicenseId,
    holder: AllocationHolder,
    active: bool,
}

/// Effects of the writes checked so far, layered over the live tables.
///
/// `None` marks a row removed by an earlier write in the same set.
#[derive(Debug)]
struct Pending<'a> {
    tables: &'a Tables,
    licenses: HashMap<LicenseId, Option<StagedLicense>>,
    license_keys: HashMap<String, Option<LicenseId>>,
    allocations: HashMap<AllocationId, StagedAllocation>,
    active: HashMap<(LicenseId, AllocationHolder), Option<AllocationId>>,
    history_ids: HashSet<HistoryEntryId>,
}

impl<'a> Pending<'a> {
    fn new(tables: &'a Tables) -> Self {
        Self {
            tables,
            licenses: HashMap::new(),
            license_keys: HashMap::new(),
            allocations: HashMap::new(),
            active: HashMap::new(),
            history_ids: HashSet::new(),
        }
    }

    /// Check every write of a change set without touching the tables.
    fn check(mut self, changes: &ChangeSet) -> AppResult<()> {
        for write in changes.license_writes() {
            self.check_license(write)?;
        }
        for write in changes.allocation_writes() {
            self.check_allocation(write)?;
        }
        for entry in changes.history() {
            self.check_history(entry)?;
        }
        Ok(())
    }

    fn check_license(&mut self, write: &LicenseWrite) -> AppResult<()> {
        match write {
            LicenseWrite::Insert(license) => {
                if self.license(license.id).is_some() {
                    return Err(AppError::conflict(format!(
                        "License {} already exists",
                        license.id
                    )));
                }
                if self.key_owner(&license.license_key).is_some() {
                    return Err(AppError::conflict("License key already exists"));
                }
                self.stage_license(license);
            }
            LicenseWrite::Update {
                license,
                expected_version,
            } => {
                let current_key = self.check_version(license.id, *expected_version)?;
                if self
                    .key_owner(&license.license_key)
                    .is_some_and(|owner| owner != license.id)
                {
                    return Err(AppError::conflict("License key already exists"));
                }
                if current_key != license.license_key {
                    self.license_keys.insert(current_key, None);
                }
                self.stage_license(license);
            }
            LicenseWrite::Delete {
                id,
                expected_version,
            } => {
                let current_key = self.check_version(*id, *expected_version)?;
                self.license_keys.insert(current_key, None);
                self.licenses.insert(*id, None);
            }
        }
        Ok(())
    }

    fn check_allocation(&mut self, write: &AllocationWrite) -> AppResult<()> {
        match write {
            AllocationWrite::Insert(allocation) => {
                if self.license(allocation.license_id).is_none() {
                    return Err(AppError::not_found(format!(
                        "License {} not found",
                        allocation.license_id
                    )));
                }
                if self.allocation(allocation.id).is_some() {
                    return Err(AppError::conflict(format!(
                        "Allocation {} already exists",
                        allocation.id
                    )));
                }
                let slot = (allocation.license_id, allocation.holder);
                if self.active_holder(slot).is_some() {
                    return Err(AppError::conflict(format!(
                        "{} already holds an active allocation on license {}",
                        allocation.holder, allocation.license_id
                    )));
                }
                let active = allocation.is_active();
                self.allocations.insert(
                    allocation.id,
                    StagedAllocation {
                        license_id: allocation.license_id,
                        holder: allocation.holder,
                        active,
                    },
                );
                if active {
                    self.active.insert(slot, Some(allocation.id));
                }
            }
            AllocationWrite::Revoke { id, .. } => {
                let mut staged = self
                    .allocation(*id)
                    .ok_or_else(|| AppError::not_found(format!("Allocation {id} not found")))?;
                if !staged.active {
                    return Err(AppError::conflict(format!(
                        "Allocation {id} is already revoked"
                    )));
                }
                staged.active = false;
                self.allocations.insert(*id, staged);
                self.active.insert((staged.license_id, staged.holder), None);
            }
        }
        Ok(())
    }

    fn check_history(&mut self, entry: &HistoryEntry) -> AppResult<()> {
        if self.tables.history_ids.contains(&entry.id) || !self.history_ids.insert(entry.id) {
            return Err(AppError::conflict(format!(
                "History entry {} already exists",
                entry.id
            )));
        }
        Ok(())
    }

    fn stage_license(&mut self, license: &License) {
        self.license_keys
            .insert(license.license_key.clone(), Some(license.id));
        self.licenses.insert(
            license.id,
            Some(StagedLicense {
                version: license.version,
                license_key: license.license_key.clone(),
            }),
        );
    }

    /// Version and key of a license as the set has left it so far.
    fn license(&self, id: LicenseId) -> Option<(i64, &str)> {
        match self.licenses.get(&id) {
            Some(staged) => staged
                .as_ref()
                .map(|s| (s.version, s.license_key.as_str())),
            None => self
                .tables
                .licenses
                .get(&id)
                .map(|l| (l.version, l.license_key.as_str())),
        }
    }

    /// Returns the current key of the license on success.
    fn check_version(&self, id: LicenseId, expected_version: i64) -> AppResult<String> {
        let (version, key) = self
            .license(id)
            .ok_or_else(|| AppError::not_found(format!("License {id} not found")))?;
        if version != expected_version {
            return Err(AppError::conflict(format!(
                "License {id} was modified concurrently (expected version {expected_version}, found {version})"
            )));
        }
        Ok(key.to_string())
    }

    fn key_owner(&self, license_key: &str) -> Option<LicenseId> {
        match self.license_keys.get(license_key) {
            Some(owner) => *owner,
            None => self.tables.license_keys.get(license_key).copied(),
        }
    }

    /// An allocation of a license deleted earlier in the set is gone.
    fn allocation(&self, id: AllocationId) -> Option<StagedAllocation> {
        let staged = match self.allocations.get(&id) {
            Some(staged) => Some(*staged),
            None => self.tables.allocations.get(&id).map(|a| StagedAllocation {
                license_id: a.license_id,
                holder: a.holder,
                active: a.is_active(),
            }),
        };
        staged.filter(|s| self.license(s.license_id).is_some())
    }

    fn active_holder(&self, slot: (LicenseId, AllocationHolder)) -> Option<AllocationId> {
        match self.active.get(&slot) {
            Some(id) => *id,
            None => self.tables.active.get(&slot).copied(),
        }
    }
}

/// In-memory [`LedgerStore`].
///
/// A commit first checks every write of the change set against the live
/// tables plus the effects of the writes before it, then applies them all.
/// Applying cannot fail, so a rejected change set leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryLedgerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of history entries recorded so far.
    pub async fn history_len(&self) -> usize {
        self.tables.read().await.history.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn find_license(&self, id: LicenseId) -> AppResult<Option<License>> {
        Ok(self.tables.read().await.licenses.get(&id).cloned())
    }

    async fn find_license_by_key(&self, license_key: &str) -> AppResult<Option<License>> {
        let tables = self.tables.read().await;
        Ok(tables
            .license_keys
            .get(license_key)
            .and_then(|id| tables.licenses.get(id))
            .cloned())
    }

    async fn license_key_exists(&self, license_key: &str) -> AppResult<bool> {
        Ok(self.tables.read().await.key_taken(license_key))
    }

    async fn list_licenses(&self, query: &LicenseQuery) -> AppResult<Vec<License>> {
        let tables = self.tables.read().await;
        let mut licenses: Vec<License> = tables
            .licenses
            .values()
            .filter(|license| query.matches(license))
            .cloned()
            .collect();
        licenses.sort_by(|a, b| {
            a.software_name
                .cmp(&b.software_name)
                .then_with(|| a.license_key.cmp(&b.license_key))
        });
        Ok(licenses)
    }

    async fn find_allocation(&self, id: AllocationId) -> AppResult<Option<Allocation>> {
        Ok(self.tables.read().await.allocations.get(&id).cloned())
    }

    async fn find_active_allocation(
        &self,
        license_id: LicenseId,
        holder: &AllocationHolder,
    ) -> AppResult<Option<Allocation>> {
        let tables = self.tables.read().await;
        Ok(tables.active_allocation(license_id, holder).cloned())
    }

    async fn list_allocations(&self, query: &AllocationQuery) -> AppResult<Vec<Allocation>> {
        let tables = self.tables.read().await;
        let mut allocations: Vec<Allocation> = tables
            .allocations
            .values()
            .filter(|allocation| query.matches(allocation))
            .cloned()
            .collect();
        allocations.sort_by(|a, b| a.granted_at.cmp(&b.granted_at).then_with(|| a.id.cmp(&b.id)));
        Ok(allocations)
    }

    async fn search_history(
        &self,
        filter: &HistoryFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<HistoryEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<HistoryEntry> = tables
            .history
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        entries.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        Ok(paginate(entries, page))
    }

    async fn commit(&self, changes: ChangeSet) -> AppResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tables = self.tables.write().await;
        Pending::new(&tables).check(&changes)?;

        let (licenses, allocations, history) = changes.into_parts();
        debug!(
            licenses = licenses.len(),
            allocations = allocations.len(),
            history = history.len(),
            "Committing change set"
        );
        for write in licenses {
            tables.apply_license(write);
        }
        for write in allocations {
            tables.apply_allocation(write);
        }
        for entry in history {
            tables.append_history(entry);
        }
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use licensehub_core::error::ErrorKind;
    use licensehub_core::types::UserId;
    use licensehub_entity::history::ActionType;
    use licensehub_entity::license::CreateLicense;

    fn license(key: &str, total: i32) -> License {
        License::new(
            CreateLicense {
                software_name: "Modeler".to_string(),
                license_key: key.to_string(),
                total_seats: total,
                expiration_date: None,
                active: true,
                description: None,
            },
            Utc::now(),
        )
    }

    fn entry(license_id: LicenseId, action_type: ActionType) -> HistoryEntry {
        HistoryEntry {
            id: HistoryEntryId::new(),
            license_id,
            user_id: None,
            group_id: None,
            action_type,
            description: action_type.to_string(),
            details: None,
            timestamp: Utc::now(),
            performed_by: "tester".to_string(),
        }
    }

    async fn seeded(store: &MemoryLedgerStore, key: &str) -> License {
        let lic = license(key, 3);
        let mut changes = ChangeSet::new();
        changes
            .insert_license(lic.clone())
            .append_history(entry(lic.id, ActionType::LicenseCreated));
        store.commit(changes).await.expect("seed license");
        lic
    }

    #[tokio::test]
    async fn test_duplicate_key_is_conflict() {
        let store = MemoryLedgerStore::new();
        seeded(&store, "KEY-1").await;

        let mut changes = ChangeSet::new();
        changes.insert_license(license("KEY-1", 1));
        let err = store.commit(changes).await.expect_err("duplicate key");
        assert!(err.is(ErrorKind::Conflict));
        assert_eq!(store.list_licenses(&LicenseQuery::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_trace() {
        let store = MemoryLedgerStore::new();
        let lic = seeded(&store, "KEY-1").await;

        let mut updated = lic.clone();
        updated.used_seats = 1;
        updated.version = 1;
        let mut changes = ChangeSet::new();
        changes
            .update_license(updated, 0)
            .insert_allocation(Allocation::grant(
                lic.id,
                AllocationHolder::User(UserId::new()),
                1,
                None,
                Utc::now(),
            ))
            .revoke_allocation(AllocationId::new(), Utc::now())
            .append_history(entry(lic.id, ActionType::LicenseAssignedToUser));

        let err = store.commit(changes).await.expect_err("unknown revoke");
        assert!(err.is(ErrorKind::NotFound));

        let stored = store.find_license(lic.id).await.unwrap().unwrap();
        assert_eq!(stored.used_seats, 0);
        assert_eq!(stored.version, 0);
        assert!(store
            .list_allocations(&AllocationQuery::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.history_len().await, 1);
    }

    #[tokio::test]
    async fn test_stale_version_is_conflict() {
        let store = MemoryLedgerStore::new();
        let lic = seeded(&store, "KEY-1").await;

        let mut first = lic.clone();
        first.version = 1;
        let mut changes = ChangeSet::new();
        changes.update_license(first, 0);
        store.commit(changes).await.expect("first update");

        let mut second = lic.clone();
        second.version = 1;
        let mut changes = ChangeSet::new();
        changes.update_license(second, 0);
        let err = store.commit(changes).await.expect_err("stale update");
        assert!(err.is(ErrorKind::Conflict));
    }

    #[tokio::test]
    async fn test_second_active_allocation_is_conflict() {
        let store = MemoryLedgerStore::new();
        let lic = seeded(&store, "KEY-1").await;
        let holder = AllocationHolder::User(UserId::new());

        let mut changes = ChangeSet::new();
        changes.insert_allocation(Allocation::grant(lic.id, holder, 1, None, Utc::now()));
        store.commit(changes).await.expect("first grant");

        let mut changes = ChangeSet::new();
        changes.insert_allocation(Allocation::grant(lic.id, holder, 1, None, Utc::now()));
        let err = store.commit(changes).await.expect_err("second grant");
        assert!(err.is(ErrorKind::Conflict));
    }

    #[tokio::test]
    async fn test_delete_cascades_allocations_but_keeps_history() {
        let store = MemoryLedgerStore::new();
        let lic = seeded(&store, "KEY-1").await;
        let grant = Allocation::grant(
            lic.id,
            AllocationHolder::User(UserId::new()),
            1,
            None,
            Utc::now(),
        );

        let mut changes = ChangeSet::new();
        changes.insert_allocation(grant.clone());
        store.commit(changes).await.expect("grant");

        let mut changes = ChangeSet::new();
        changes
            .delete_license(lic.id, 0)
            .append_history(entry(lic.id, ActionType::LicenseDeleted));
        store.commit(changes).await.expect("delete");

        assert!(store.find_license(lic.id).await.unwrap().is_none());
        assert!(store.find_allocation(grant.id).await.unwrap().is_none());

        let filter = HistoryFilter {
            license_id: Some(lic.id),
            ..HistoryFilter::default()
        };
        let history = store
            .search_history(&filter, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(history.total_items, 2);
        assert_eq!(history.items[0].action_type, ActionType::LicenseDeleted);
    }

    #[tokio::test]
    async fn test_double_revoke_is_conflict() {
        let store = MemoryLedgerStore::new();
        let lic = seeded(&store, "KEY-1").await;
        let grant = Allocation::grant(
            lic.id,
            AllocationHolder::User(UserId::new()),
            1,
            None,
            Utc::now(),
        );
        let mut changes = ChangeSet::new();
        changes.insert_allocation(grant.clone());
        store.commit(changes).await.expect("grant");

        let mut changes = ChangeSet::new();
        changes.revoke_allocation(grant.id, Utc::now());
        store.commit(changes).await.expect("revoke");

        let mut changes = ChangeSet::new();
        changes.revoke_allocation(grant.id, Utc::now());
        let err = store.commit(changes).await.expect_err("double revoke");
        assert!(err.is(ErrorKind::Conflict));
    }

    #[tokio::test]
    async fn test_duplicate_holder_within_one_set_is_rejected_whole() {
        let store = MemoryLedgerStore::new();
        let lic = seeded(&store, "KEY-1").await;
        let holder = AllocationHolder::User(UserId::new());

        let mut changes = ChangeSet::new();
        changes
            .insert_allocation(Allocation::grant(lic.id, holder, 1, None, Utc::now()))
            .insert_allocation(Allocation::grant(lic.id, holder, 1, None, Utc::now()))
            .append_history(entry(lic.id, ActionType::LicenseAssignedToUser));
        let err = store.commit(changes).await.expect_err("same holder twice");
        assert!(err.is(ErrorKind::Conflict));

        assert!(store.find_active_allocation(lic.id, &holder).await.unwrap().is_none());
        assert_eq!(store.history_len().await, 1);
    }

    #[tokio::test]
    async fn test_revoke_then_regrant_in_one_set() {
        let store = MemoryLedgerStore::new();
        let lic = seeded(&store, "KEY-1").await;
        let holder = AllocationHolder::User(UserId::new());
        let first = Allocation::grant(lic.id, holder, 1, None, Utc::now());

        let mut changes = ChangeSet::new();
        changes.insert_allocation(first.clone());
        store.commit(changes).await.expect("grant");

        let second = Allocation::grant(lic.id, holder, 1, None, Utc::now());
        let mut changes = ChangeSet::new();
        changes
            .revoke_allocation(first.id, Utc::now())
            .insert_allocation(second.clone());
        store.commit(changes).await.expect("revoke and regrant");

        let active = store.find_active_allocation(lic.id, &holder).await.unwrap();
        assert_eq!(active.map(|a| a.id), Some(second.id));
        assert!(!store.find_allocation(first.id).await.unwrap().unwrap().is_active());
    }

    #[tokio::test]
    async fn test_rekeyed_license_frees_its_old_key() {
        let store = MemoryLedgerStore::new();
        let lic = seeded(&store, "KEY-1").await;

        let mut renamed = lic.clone();
        renamed.license_key = "KEY-2".to_string();
        renamed.version = 1;
        let mut changes = ChangeSet::new();
        changes.update_license(renamed, 0);
        store.commit(changes).await.expect("rekey");

        assert!(!store.license_key_exists("KEY-1").await.unwrap());
        let found = store.find_license_by_key("KEY-2").await.unwrap().unwrap();
        assert_eq!(found.id, lic.id);

        let mut changes = ChangeSet::new();
        changes.insert_license(license("KEY-1", 1));
        store.commit(changes).await.expect("old key reusable");
    }

    #[tokio::test]
    async fn test_duplicate_history_id_within_one_set_is_conflict() {
        let store = MemoryLedgerStore::new();
        let lic = seeded(&store, "KEY-1").await;
        let repeated = entry(lic.id, ActionType::LicenseUpdated);

        let mut changes = ChangeSet::new();
        changes
            .append_history(repeated.clone())
            .append_history(repeated);
        let err = store.commit(changes).await.expect_err("repeated entry");
        assert!(err.is(ErrorKind::Conflict));
        assert_eq!(store.history_len().await, 1);
    }
}
