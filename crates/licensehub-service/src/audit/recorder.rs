//! Builds history entries for ledger mutations and answers history queries.
//!
//! Entries are never written on their own: each one is staged into the same
//! change set as the mutation it describes, so the trail and the state it
//! describes commit or fail together.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use licensehub_core::config::LedgerConfig;
use licensehub_core::error::AppError;
use licensehub_core::result::AppResult;
use licensehub_core::types::pagination::{PageRequest, PageResponse};
use licensehub_core::types::{GroupId, LicenseId, UserId};
use licensehub_database::store::{HistoryFilter, LedgerStore};
use licensehub_entity::allocation::Allocation;
use licensehub_entity::directory::{DirectoryGroup, DirectoryUser};
use licensehub_entity::history::{ActionType, HistoryEntry};
use licensehub_entity::license::License;

use crate::context::RequestContext;

/// Audit trail writer and reader.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    store: Arc<dyn LedgerStore>,
    recent_limit: u64,
}

impl AuditRecorder {
    /// Creates a new audit recorder.
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self {
            store,
            recent_limit: config.recent_history_limit,
        }
    }

    fn entry(
        ctx: &RequestContext,
        license_id: LicenseId,
        action: ActionType,
        description: String,
    ) -> HistoryEntry {
        HistoryEntry::new(
            license_id,
            action,
            description,
            ctx.actor.clone(),
            ctx.request_time,
        )
    }

    /// `LICENSE_CREATED`.
    pub fn license_created(&self, ctx: &RequestContext, license: &License) -> HistoryEntry {
        let expiration = license
            .expiration_date
            .map(|date| date.to_rfc3339())
            .unwrap_or_else(|| "none".to_string());
        Self::entry(
            ctx,
            license.id,
            ActionType::LicenseCreated,
            format!("License created: {}", license.software_name),
        )
        .with_details(Some(format!(
            "Total seats: {}, Expiration: {expiration}",
            license.total_seats
        )))
    }

    /// `LICENSE_UPDATED`.
    pub fn license_updated(&self, ctx: &RequestContext, license: &License) -> HistoryEntry {
        Self::entry(
            ctx,
            license.id,
            ActionType::LicenseUpdated,
            format!("License updated: {}", license.software_name),
        )
        .with_details(Some("License details modified".to_string()))
    }

    /// `SEATS_INCREASED` or `SEATS_DECREASED`, or `None` when the capacity
    /// did not change.
    pub fn seats_changed(
        &self,
        ctx: &RequestContext,
        license_id: LicenseId,
        old_total: i32,
        new_total: i32,
    ) -> Option<HistoryEntry> {
        let action = match new_total.cmp(&old_total) {
            std::cmp::Ordering::Greater => ActionType::SeatsIncreased,
            std::cmp::Ordering::Less => ActionType::SeatsDecreased,
            std::cmp::Ordering::Equal => return None,
        };
        Some(Self::entry(
            ctx,
            license_id,
            action,
            format!("Total seats changed from {old_total} to {new_total}"),
        ))
    }

    /// `LICENSE_DELETED`.
    pub fn license_deleted(&self, ctx: &RequestContext, license: &License) -> HistoryEntry {
        Self::entry(
            ctx,
            license.id,
            ActionType::LicenseDeleted,
            format!("License deleted: {}", license.software_name),
        )
        .with_details(Some(format!(
            "Seats in use at deletion: {}",
            license.used_seats
        )))
    }

    /// `LICENSE_ASSIGNED_TO_USER`.
    pub fn assigned_to_user(
        &self,
        ctx: &RequestContext,
        allocation: &Allocation,
        user: &DirectoryUser,
    ) -> HistoryEntry {
        Self::entry(
            ctx,
            allocation.license_id,
            ActionType::LicenseAssignedToUser,
            format!("License assigned to user: {}", user.username),
        )
        .with_user(user.id)
        .with_details(allocation.notes.clone())
    }

    /// `LICENSE_REVOKED_FROM_USER`. `username` falls back to the id when the
    /// user has left the directory.
    pub fn revoked_from_user(
        &self,
        ctx: &RequestContext,
        allocation: &Allocation,
        user_id: UserId,
        username: &str,
    ) -> HistoryEntry {
        Self::entry(
            ctx,
            allocation.license_id,
            ActionType::LicenseRevokedFromUser,
            format!("License revoked from user: {username}"),
        )
        .with_user(user_id)
    }

    /// `LICENSE_ASSIGNED_TO_GROUP`.
    pub fn assigned_to_group(
        &self,
        ctx: &RequestContext,
        allocation: &Allocation,
        group: &DirectoryGroup,
    ) -> HistoryEntry {
        Self::entry(
            ctx,
            allocation.license_id,
            ActionType::LicenseAssignedToGroup,
            format!(
                "License assigned to group: {} ({} seats)",
                group.name, allocation.seats
            ),
        )
        .with_group(group.id)
        .with_details(allocation.notes.clone())
    }

    /// `LICENSE_REVOKED_FROM_GROUP`.
    pub fn revoked_from_group(
        &self,
        ctx: &RequestContext,
        allocation: &Allocation,
        group_id: GroupId,
        group_name: &str,
    ) -> HistoryEntry {
        Self::entry(
            ctx,
            allocation.license_id,
            ActionType::LicenseRevokedFromGroup,
            format!(
                "License revoked from group: {group_name} ({} seats freed)",
                allocation.seats
            ),
        )
        .with_group(group_id)
    }

    /// History of one license, newest first. Still answers after the
    /// license is deleted.
    pub async fn for_license(
        &self,
        license_id: LicenseId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<HistoryEntry>> {
        self.search(
            &HistoryFilter {
                license_id: Some(license_id),
                ..HistoryFilter::default()
            },
            page,
        )
        .await
    }

    /// History involving one user, newest first.
    pub async fn for_user(
        &self,
        user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<HistoryEntry>> {
        self.search(
            &HistoryFilter {
                user_id: Some(user_id),
                ..HistoryFilter::default()
            },
            page,
        )
        .await
    }

    /// History involving one group, newest first.
    pub async fn for_group(
        &self,
        group_id: GroupId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<HistoryEntry>> {
        self.search(
            &HistoryFilter {
                group_id: Some(group_id),
                ..HistoryFilter::default()
            },
            page,
        )
        .await
    }

    /// History of one action type, newest first.
    pub async fn by_action(
        &self,
        action: ActionType,
        page: &PageRequest,
    ) -> AppResult<PageResponse<HistoryEntry>> {
        self.search(
            &HistoryFilter {
                action_type: Some(action),
                ..HistoryFilter::default()
            },
            page,
        )
        .await
    }

    /// History within `[from, to]`, newest first.
    pub async fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<HistoryEntry>> {
        self.search(
            &HistoryFilter {
                from: Some(from),
                to: Some(to),
                ..HistoryFilter::default()
            },
            page,
        )
        .await
    }

    /// The most recent entries. `limit` defaults to the configured size.
    pub async fn recent(&self, limit: Option<u64>) -> AppResult<Vec<HistoryEntry>> {
        let page = PageRequest::first(limit.unwrap_or(self.recent_limit));
        Ok(self
            .search(&HistoryFilter::default(), &page)
            .await?
            .items)
    }

    /// Combined filtered search, newest first.
    pub async fn search(
        &self,
        filter: &HistoryFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<HistoryEntry>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::validation(format!(
                    "History range start {from} is after its end {to}"
                )));
            }
        }

        debug!(?filter, page = page.page, page_size = page.page_size, "Searching history");
        self.store.search_history(filter, page).await
    }
}
