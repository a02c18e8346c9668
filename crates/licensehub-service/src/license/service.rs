//! License lifecycle manager.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use validator::Validate;

use licensehub_core::error::AppError;
use licensehub_core::result::AppResult;
use licensehub_core::types::LicenseId;
use licensehub_database::store::{ChangeSet, LedgerStore, LicenseQuery};
use licensehub_entity::license::{CreateLicense, License, UpdateLicense};

use crate::audit::AuditRecorder;
use crate::context::RequestContext;
use crate::seat::{SeatAccountant, SeatTransaction};

/// Creates, edits, deletes, and looks up licenses.
#[derive(Debug, Clone)]
pub struct LicenseService {
    store: Arc<dyn LedgerStore>,
    accountant: SeatAccountant,
    recorder: AuditRecorder,
}

impl LicenseService {
    /// Creates a new license service.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        accountant: SeatAccountant,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            store,
            accountant,
            recorder,
        }
    }

    /// Create a license with no seats in use.
    pub async fn create(&self, ctx: &RequestContext, data: CreateLicense) -> AppResult<License> {
        data.validate()?;
        require_text("Software name", &data.software_name)?;
        require_text("License key", &data.license_key)?;

        let license = License::new(data, ctx.request_time);

        // The store re-checks uniqueness inside the commit; this only gives
        // the common case a clear error before any write is attempted.
        if self.store.license_key_exists(&license.license_key).await? {
            return Err(AppError::conflict(format!(
                "License key '{}' already exists",
                license.license_key
            )));
        }

        let mut changes = ChangeSet::new();
        changes
            .insert_license(license.clone())
            .append_history(self.recorder.license_created(ctx, &license));
        self.store.commit(changes).await?;

        info!(
            license_id = %license.id,
            software_name = %license.software_name,
            total_seats = license.total_seats,
            actor = %ctx.actor,
            "License created"
        );

        Ok(license)
    }

    /// Replace a license's editable attributes.
    ///
    /// `license_key` and `used_seats` are never touched. A capacity change is
    /// recorded as a second history entry.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: LicenseId,
        data: UpdateLicense,
    ) -> AppResult<License> {
        data.validate()?;
        require_text("Software name", &data.software_name)?;

        let tx = self.accountant.begin(id, ctx.request_time).await?;
        self.commit_update(ctx, tx, &data).await
    }

    /// Edit a license starting from its current attributes.
    ///
    /// `edit` runs under the license lock on the stored values, so fields it
    /// leaves alone keep whatever a concurrent update committed before it.
    pub async fn modify<F>(
        &self,
        ctx: &RequestContext,
        id: LicenseId,
        edit: F,
    ) -> AppResult<License>
    where
        F: FnOnce(&mut UpdateLicense),
    {
        let tx = self.accountant.begin(id, ctx.request_time).await?;
        let mut data = UpdateLicense::from_license(tx.license());
        edit(&mut data);

        data.validate()?;
        require_text("Software name", &data.software_name)?;
        self.commit_update(ctx, tx, &data).await
    }

    async fn commit_update(
        &self,
        ctx: &RequestContext,
        mut tx: SeatTransaction,
        data: &UpdateLicense,
    ) -> AppResult<License> {
        let id = tx.original().id;
        let old_total = tx.original().total_seats;
        tx.apply(data)?;

        let updated = self.recorder.license_updated(ctx, tx.license());
        let resized = self
            .recorder
            .seats_changed(ctx, id, old_total, tx.license().total_seats);
        tx.changes().append_history(updated);
        if let Some(entry) = resized {
            tx.changes().append_history(entry);
        }

        let license = tx.commit().await?;

        info!(
            license_id = %id,
            old_total_seats = old_total,
            total_seats = license.total_seats,
            used_seats = license.used_seats,
            actor = %ctx.actor,
            "License updated"
        );

        Ok(license)
    }

    /// Delete a license together with all of its allocations.
    ///
    /// Returns the license as it was just before deletion.
    pub async fn delete(&self, ctx: &RequestContext, id: LicenseId) -> AppResult<License> {
        let mut tx = self.accountant.begin(id, ctx.request_time).await?;
        let entry = self.recorder.license_deleted(ctx, tx.license());
        tx.changes().append_history(entry);
        tx.delete();

        let license = tx.commit().await?;
        self.accountant.forget(id);

        info!(
            license_id = %id,
            software_name = %license.software_name,
            released_seats = license.used_seats,
            actor = %ctx.actor,
            "License deleted"
        );

        Ok(license)
    }

    /// Get a license by id.
    pub async fn get(&self, id: LicenseId) -> AppResult<License> {
        self.store
            .find_license(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("License {id} not found")))
    }

    /// Get a license by its vendor key.
    pub async fn find_by_key(&self, license_key: &str) -> AppResult<License> {
        self.store
            .find_license_by_key(license_key.trim())
            .await?
            .ok_or_else(|| AppError::not_found(format!("License key '{license_key}' not found")))
    }

    /// List licenses matching a query.
    pub async fn list(&self, query: &LicenseQuery) -> AppResult<Vec<License>> {
        if let LicenseQuery::ExpiringBetween { from, to } = query {
            if from > to {
                return Err(AppError::validation(format!(
                    "Expiration window start {from} is after its end {to}"
                )));
            }
        }
        debug!(?query, "Listing licenses");
        self.store.list_licenses(query).await
    }

    /// Licenses expiring within `[from, to]`.
    pub async fn list_expiring(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<License>> {
        self.list(&LicenseQuery::ExpiringBetween { from, to }).await
    }

    /// Licenses using at least `threshold_percent` of their seats.
    pub async fn list_by_usage(&self, threshold_percent: u8) -> AppResult<Vec<License>> {
        let licenses = self.list(&LicenseQuery::All).await?;
        Ok(licenses
            .into_iter()
            .filter(|license| license.usage().is_at_least(threshold_percent))
            .collect())
    }

    /// Licenses that expired before `instant`.
    pub async fn list_expired(&self, instant: DateTime<Utc>) -> AppResult<Vec<License>> {
        self.list(&LicenseQuery::ExpiredBefore(instant)).await
    }
}

fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be blank")));
    }
    Ok(())
}
