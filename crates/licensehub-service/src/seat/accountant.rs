//! Per-license serialization of seat-affecting operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use licensehub_core::config::LedgerConfig;
use licensehub_core::error::AppError;
use licensehub_core::result::AppResult;
use licensehub_core::types::LicenseId;
use licensehub_database::store::LedgerStore;
use licensehub_entity::license::License;

use super::transaction::SeatTransaction;

/// Hands out [`SeatTransaction`]s, at most one per license at a time.
///
/// Operations on different licenses take different locks and never wait on
/// each other. The lock is held from the moment the license is loaded until
/// its transaction is committed or dropped, so no second operation can see
/// the license between a capacity check and the write that depends on it.
#[derive(Debug, Clone)]
pub struct SeatAccountant {
    store: Arc<dyn LedgerStore>,
    locks: Arc<DashMap<LicenseId, Arc<Mutex<()>>>>,
    allow_capacity_below_usage: bool,
}

impl SeatAccountant {
    /// Creates a new seat accountant.
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
            allow_capacity_below_usage: config.allow_capacity_below_usage,
        }
    }

    /// Lock a license and load it for a seat-affecting change.
    ///
    /// Fails with `NotFound` if the license does not exist once the lock is
    /// held.
    pub async fn begin(
        &self,
        license_id: LicenseId,
        now: DateTime<Utc>,
    ) -> AppResult<SeatTransaction> {
        let (guard, license) = self.lock_existing(license_id).await?;

        debug!(
            license_id = %license_id,
            used_seats = license.used_seats,
            total_seats = license.total_seats,
            "Seat transaction opened"
        );

        Ok(SeatTransaction::new(
            guard,
            Arc::clone(&self.store),
            license,
            self.allow_capacity_below_usage,
            now,
        ))
    }

    /// Lock a license and load it, without opening a transaction.
    ///
    /// A missing license leaves no lock entry behind.
    pub async fn lock_existing(
        &self,
        license_id: LicenseId,
    ) -> AppResult<(OwnedMutexGuard<()>, License)> {
        let guard = self.lock(license_id).await;

        match self.store.find_license(license_id).await {
            Ok(Some(license)) => Ok((guard, license)),
            Ok(None) => {
                drop(guard);
                self.forget(license_id);
                Err(AppError::not_found(format!(
                    "License {license_id} not found"
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// Acquire the lock for a license without loading it.
    async fn lock(&self, license_id: LicenseId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await.
        let mutex = Arc::clone(
            self.locks
                .entry(license_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        mutex.lock_owned().await
    }

    /// Drop the lock entry of a license nobody is holding or waiting on.
    ///
    /// Every holder and waiter keeps a clone of the mutex, so an entry whose
    /// only reference is the map itself is idle. Busy entries are kept.
    pub fn forget(&self, license_id: LicenseId) {
        self.locks
            .remove_if(&license_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of licenses with a live lock entry.
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    /// The store transactions commit to.
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use licensehub_core::error::ErrorKind;
    use licensehub_database::store::{ChangeSet, MemoryLedgerStore};
    use licensehub_entity::license::CreateLicense;

    fn accountant() -> SeatAccountant {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryLedgerStore::new());
        SeatAccountant::new(store, &LedgerConfig::default())
    }

    #[tokio::test]
    async fn test_unknown_license_leaves_no_lock_entry() {
        let accountant = accountant();

        for _ in 0..1000 {
            let err = accountant
                .begin(LicenseId::new(), Utc::now())
                .await
                .unwrap_err();
            assert!(err.is(ErrorKind::NotFound));
        }
        assert_eq!(accountant.tracked_locks(), 0);

        let err = accountant
            .lock_existing(LicenseId::new())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
        assert_eq!(accountant.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_forget_keeps_entry_while_lock_is_held() {
        let accountant = accountant();
        let license = License::new(
            CreateLicense {
                software_name: "Tool".to_string(),
                license_key: "TOOL-1".to_string(),
                total_seats: 1,
                expiration_date: None,
                active: true,
                description: None,
            },
            Utc::now(),
        );
        let mut changes = ChangeSet::new();
        changes.insert_license(license.clone());
        accountant.store().commit(changes).await.unwrap();

        let tx = accountant.begin(license.id, Utc::now()).await.unwrap();
        accountant.forget(license.id);
        assert_eq!(accountant.tracked_locks(), 1);

        drop(tx);
        accountant.forget(license.id);
        assert_eq!(accountant.tracked_locks(), 0);
    }
}
