//! Assignment engine: grant and revoke seats as single units of work.
//!
//! User assignments and group allocations share one path: an
//! [`AllocationHolder`] says who holds the seats and how many they cost,
//! and the only differences left are the directory lookup and the wording
//! of the history entry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use validator::Validate;

use licensehub_core::config::LedgerConfig;
use licensehub_core::error::AppError;
use licensehub_core::result::AppResult;
use licensehub_core::types::{AllocationId, GroupId, LicenseId, UserId};
use licensehub_database::directory::Directory;
use licensehub_database::store::{AllocationQuery, LedgerStore};
use licensehub_entity::allocation::{Allocation, AllocationHolder, HolderKind};
use licensehub_entity::directory::{DirectoryGroup, DirectoryUser};
use licensehub_entity::history::HistoryEntry;

use crate::audit::AuditRecorder;
use crate::context::RequestContext;
use crate::seat::SeatAccountant;

/// Request to assign one seat to a user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssignUserRequest {
    /// License to draw the seat from.
    pub license_id: LicenseId,
    /// User receiving the seat.
    pub user_id: UserId,
    /// Notes recorded with the assignment.
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

/// Request to allocate a block of seats to a group.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssignGroupRequest {
    /// License to draw the seats from.
    pub license_id: LicenseId,
    /// Group receiving the seats.
    pub group_id: GroupId,
    /// Size of the block.
    #[validate(range(min = 1, message = "Allocated seats must be positive"))]
    pub seats: i32,
    /// Notes recorded with the allocation.
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

/// A resolved directory principal.
enum Principal {
    User(DirectoryUser),
    Group(DirectoryGroup),
}

impl Principal {
    fn is_active(&self) -> bool {
        match self {
            Self::User(user) => user.active,
            Self::Group(group) => group.active,
        }
    }

    fn label(&self) -> String {
        match self {
            Self::User(user) => format!("User {}", user.username),
            Self::Group(group) => format!("Group {}", group.name),
        }
    }
}

/// Orchestrates assignment and revocation for users and groups.
#[derive(Debug, Clone)]
pub struct AssignmentService {
    store: Arc<dyn LedgerStore>,
    directory: Arc<dyn Directory>,
    accountant: SeatAccountant,
    recorder: AuditRecorder,
    require_active_principals: bool,
}

impl AssignmentService {
    /// Creates a new assignment service.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        directory: Arc<dyn Directory>,
        accountant: SeatAccountant,
        recorder: AuditRecorder,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            store,
            directory,
            accountant,
            recorder,
            require_active_principals: config.require_active_principals,
        }
    }

    /// Assign one seat of a license to a user.
    pub async fn assign_to_user(
        &self,
        ctx: &RequestContext,
        req: AssignUserRequest,
    ) -> AppResult<Allocation> {
        req.validate()?;
        let user = self.resolve_user(req.user_id).await?;
        self.grant(
            ctx,
            req.license_id,
            AllocationHolder::User(req.user_id),
            1,
            req.notes,
            Principal::User(user),
        )
        .await
    }

    /// Allocate a block of seats of a license to a group.
    pub async fn assign_to_group(
        &self,
        ctx: &RequestContext,
        req: AssignGroupRequest,
    ) -> AppResult<Allocation> {
        req.validate()?;
        let group = self.resolve_group(req.group_id).await?;
        self.grant(
            ctx,
            req.license_id,
            AllocationHolder::Group(req.group_id),
            req.seats,
            req.notes,
            Principal::Group(group),
        )
        .await
    }

    /// Revoke a user assignment and release its seat.
    pub async fn revoke_from_user(
        &self,
        ctx: &RequestContext,
        allocation_id: AllocationId,
    ) -> AppResult<Allocation> {
        self.revoke(ctx, allocation_id, HolderKind::User).await
    }

    /// Revoke a group allocation and release its block of seats.
    pub async fn revoke_from_group(
        &self,
        ctx: &RequestContext,
        allocation_id: AllocationId,
    ) -> AppResult<Allocation> {
        self.revoke(ctx, allocation_id, HolderKind::Group).await
    }

    /// Active assignments held by a user.
    pub async fn list_active_for_user(&self, user_id: UserId) -> AppResult<Vec<Allocation>> {
        self.resolve_user(user_id).await?;
        self.store
            .list_allocations(&AllocationQuery::for_holder(AllocationHolder::User(user_id)).active())
            .await
    }

    /// Active allocations held by a group.
    pub async fn list_active_for_group(&self, group_id: GroupId) -> AppResult<Vec<Allocation>> {
        self.resolve_group(group_id).await?;
        self.store
            .list_allocations(
                &AllocationQuery::for_holder(AllocationHolder::Group(group_id)).active(),
            )
            .await
    }

    /// Active allocations drawn from a license, optionally of one kind.
    pub async fn list_active_for_license(
        &self,
        license_id: LicenseId,
        kind: Option<HolderKind>,
    ) -> AppResult<Vec<Allocation>> {
        self.ensure_license(license_id).await?;
        let mut query = AllocationQuery::for_license(license_id).active();
        query.holder_kind = kind;
        self.store.list_allocations(&query).await
    }

    /// Every allocation ever granted on a license, revoked ones included.
    pub async fn list_allocations_for_license(
        &self,
        license_id: LicenseId,
    ) -> AppResult<Vec<Allocation>> {
        self.ensure_license(license_id).await?;
        self.store
            .list_allocations(&AllocationQuery::for_license(license_id))
            .await
    }

    async fn grant(
        &self,
        ctx: &RequestContext,
        license_id: LicenseId,
        holder: AllocationHolder,
        seats: i32,
        notes: Option<String>,
        principal: Principal,
    ) -> AppResult<Allocation> {
        let mut tx = self.accountant.begin(license_id, ctx.request_time).await?;

        if self.require_active_principals && !principal.is_active() {
            return Err(AppError::validation(format!(
                "{} is inactive",
                principal.label()
            )));
        }

        let license = tx.license();
        if !license.active || license.is_expired(ctx.request_time) {
            warn!(
                license_id = %license_id,
                active = license.active,
                expiration_date = ?license.expiration_date,
                "Assigning seats on an inactive or expired license"
            );
        }

        if self
            .store
            .find_active_allocation(license_id, &holder)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "{} already holds an active allocation on license {license_id}",
                principal.label()
            )));
        }

        tx.reserve(seats)?;

        let allocation = Allocation::grant(license_id, holder, seats, notes, tx.now());
        let entry = match &principal {
            Principal::User(user) => self.recorder.assigned_to_user(ctx, &allocation, user),
            Principal::Group(group) => self.recorder.assigned_to_group(ctx, &allocation, group),
        };
        tx.changes()
            .insert_allocation(allocation.clone())
            .append_history(entry);

        let license = tx.commit().await?;

        info!(
            license_id = %license_id,
            allocation_id = %allocation.id,
            holder = %allocation.holder,
            seats = seats,
            used_seats = license.used_seats,
            total_seats = license.total_seats,
            actor = %ctx.actor,
            "Seats granted"
        );

        Ok(allocation)
    }

    async fn revoke(
        &self,
        ctx: &RequestContext,
        allocation_id: AllocationId,
        kind: HolderKind,
    ) -> AppResult<Allocation> {
        let not_found = || match kind {
            HolderKind::User => {
                AppError::not_found(format!("User assignment {allocation_id} not found"))
            }
            HolderKind::Group => {
                AppError::not_found(format!("Group allocation {allocation_id} not found"))
            }
        };

        let found = self
            .store
            .find_allocation(allocation_id)
            .await?
            .filter(|allocation| allocation.holder.kind() == kind)
            .ok_or_else(not_found)?;

        let mut tx = self
            .accountant
            .begin(found.license_id, ctx.request_time)
            .await?;

        // Re-read under the lock: a concurrent revoke may have won.
        let mut allocation = self
            .store
            .find_allocation(allocation_id)
            .await?
            .ok_or_else(not_found)?;
        if !allocation.is_active() {
            return Err(AppError::conflict(format!(
                "Allocation {allocation_id} is already revoked"
            )));
        }

        let now = tx.now();
        tx.release(allocation.seats);
        allocation.revoke(now);

        let entry = self.revocation_entry(ctx, &allocation).await?;
        tx.changes()
            .revoke_allocation(allocation.id, now)
            .append_history(entry);

        let license = tx.commit().await?;

        info!(
            license_id = %allocation.license_id,
            allocation_id = %allocation.id,
            holder = %allocation.holder,
            seats = allocation.seats,
            used_seats = license.used_seats,
            total_seats = license.total_seats,
            actor = %ctx.actor,
            "Seats revoked"
        );

        Ok(allocation)
    }

    async fn revocation_entry(
        &self,
        ctx: &RequestContext,
        allocation: &Allocation,
    ) -> AppResult<HistoryEntry> {
        // Principals are weak references and may have left the directory.
        let entry = match allocation.holder {
            AllocationHolder::User(user_id) => {
                let username = self
                    .directory
                    .find_user(user_id)
                    .await?
                    .map(|user| user.username)
                    .unwrap_or_else(|| user_id.to_string());
                self.recorder
                    .revoked_from_user(ctx, allocation, user_id, &username)
            }
            AllocationHolder::Group(group_id) => {
                let name = self
                    .directory
                    .find_group(group_id)
                    .await?
                    .map(|group| group.name)
                    .unwrap_or_else(|| group_id.to_string());
                self.recorder
                    .revoked_from_group(ctx, allocation, group_id, &name)
            }
        };
        Ok(entry)
    }

    async fn resolve_user(&self, user_id: UserId) -> AppResult<DirectoryUser> {
        self.directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))
    }

    async fn resolve_group(&self, group_id: GroupId) -> AppResult<DirectoryGroup> {
        self.directory
            .find_group(group_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Group {group_id} not found")))
    }

    async fn ensure_license(&self, license_id: LicenseId) -> AppResult<()> {
        debug!(license_id = %license_id, "Resolving license for allocation query");
        if self.store.find_license(license_id).await?.is_none() {
            return Err(AppError::not_found(format!("License {license_id} not found")));
        }
        Ok(())
    }
}
