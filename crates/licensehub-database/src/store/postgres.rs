//! PostgreSQL store implementation.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use licensehub_core::error::{AppError, ErrorKind};
use licensehub_core::result::AppResult;
use licensehub_core::types::pagination::{PageRequest, PageResponse};
use licensehub_core::types::{AllocationId, LicenseId};
use licensehub_entity::allocation::{Allocation, AllocationHolder, AllocationRow};
use licensehub_entity::history::HistoryEntry;
use licensehub_entity::license::License;

use super::changeset::{AllocationWrite, ChangeSet, LicenseWrite};
use super::query::{AllocationQuery, HistoryFilter, LicenseQuery};
use super::LedgerStore;

const ALLOCATION_COLUMNS: &str = "id, license_id, holder_kind, user_id, group_id, seats, \
     granted_at, revoked_at, notes";

/// [`LedgerStore`] over PostgreSQL. Each commit runs in one transaction.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply_license(conn: &mut PgConnection, write: &LicenseWrite) -> AppResult<()> {
        match write {
            LicenseWrite::Insert(license) => {
                sqlx::query(
                    "INSERT INTO licenses (id, software_name, license_key, total_seats, used_seats, \
                     expiration_date, active, description, version, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
                )
                .bind(license.id)
                .bind(&license.software_name)
                .bind(&license.license_key)
                .bind(license.total_seats)
                .bind(license.used_seats)
                .bind(license.expiration_date)
                .bind(license.active)
                .bind(&license.description)
                .bind(license.version)
                .bind(license.created_at)
                .bind(license.updated_at)
                .execute(&mut *conn)
                .await
                .map_err(|e| write_error(e, "Failed to insert license"))?;
            }
            LicenseWrite::Update {
                license,
                expected_version,
            } => {
                let result = sqlx::query(
                    "UPDATE licenses SET software_name = $2, total_seats = $3, used_seats = $4, \
                     expiration_date = $5, active = $6, description = $7, version = $8, \
                     updated_at = $9 WHERE id = $1 AND version = $10",
                )
                .bind(license.id)
                .bind(&license.software_name)
                .bind(license.total_seats)
                .bind(license.used_seats)
                .bind(license.expiration_date)
                .bind(license.active)
                .bind(&license.description)
                .bind(license.version)
                .bind(license.updated_at)
                .bind(*expected_version)
                .execute(&mut *conn)
                .await
                .map_err(|e| write_error(e, "Failed to update license"))?;

                if result.rows_affected() == 0 {
                    return Err(Self::stale_license(conn, license.id, *expected_version).await);
                }
            }
            LicenseWrite::Delete {
                id,
                expected_version,
            } => {
                // Allocations go with the license through ON DELETE CASCADE.
                let result = sqlx::query("DELETE FROM licenses WHERE id = $1 AND version = $2")
                    .bind(*id)
                    .bind(*expected_version)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| write_error(e, "Failed to delete license"))?;

                if result.rows_affected() == 0 {
                    return Err(Self::stale_license(conn, *id, *expected_version).await);
                }
            }
        }
        Ok(())
    }

    async fn apply_allocation(conn: &mut PgConnection, write: &AllocationWrite) -> AppResult<()> {
        match write {
            AllocationWrite::Insert(allocation) => {
                let row = AllocationRow::from(allocation);
                sqlx::query(
                    "INSERT INTO license_allocations (id, license_id, holder_kind, user_id, group_id, \
                     seats, granted_at, revoked_at, notes) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                )
                .bind(row.id)
                .bind(row.license_id)
                .bind(row.holder_kind)
                .bind(row.user_id)
                .bind(row.group_id)
                .bind(row.seats)
                .bind(row.granted_at)
                .bind(row.revoked_at)
                .bind(&row.notes)
                .execute(&mut *conn)
                .await
                .map_err(|e| write_error(e, "Failed to insert allocation"))?;
            }
            AllocationWrite::Revoke { id, revoked_at } => {
                let result = sqlx::query(
                    "UPDATE license_allocations SET revoked_at = $2 \
                     WHERE id = $1 AND revoked_at IS NULL",
                )
                .bind(*id)
                .bind(*revoked_at)
                .execute(&mut *conn)
                .await
                .map_err(|e| write_error(e, "Failed to revoke allocation"))?;

                if result.rows_affected() == 0 {
                    let exists: bool = sqlx::query_scalar(
                        "SELECT EXISTS(SELECT 1 FROM license_allocations WHERE id = $1)",
                    )
                    .bind(*id)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to check allocation", e)
                    })?;
                    return Err(if exists {
                        AppError::conflict(format!("Allocation {id} is already revoked"))
                    } else {
                        AppError::not_found(format!("Allocation {id} not found"))
                    });
                }
            }
        }
        Ok(())
    }

    async fn append_history(conn: &mut PgConnection, entry: &HistoryEntry) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO license_history (id, license_id, user_id, group_id, action_type, \
             description, details, timestamp, performed_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id)
        .bind(entry.license_id)
        .bind(entry.user_id)
        .bind(entry.group_id)
        .bind(entry.action_type)
        .bind(&entry.description)
        .bind(&entry.details)
        .bind(entry.timestamp)
        .bind(&entry.performed_by)
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error(e, "Failed to append history entry"))?;
        Ok(())
    }

    /// Explain why a version-guarded write touched no rows.
    async fn stale_license(conn: &mut PgConnection, id: LicenseId, expected: i64) -> AppError {
        let current: Result<Option<i64>, _> =
            sqlx::query_scalar("SELECT version FROM licenses WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await;
        match current {
            Ok(Some(found)) => AppError::conflict(format!(
                "License {id} was modified concurrently (expected version {expected}, found {found})"
            )),
            Ok(None) => AppError::not_found(format!("License {id} not found")),
            Err(e) => AppError::with_source(ErrorKind::Database, "Failed to check license", e),
        }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_license(&self, id: LicenseId) -> AppResult<Option<License>> {
        sqlx::query_as::<_, License>("SELECT * FROM licenses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find license", e))
    }

    async fn find_license_by_key(&self, license_key: &str) -> AppResult<Option<License>> {
        sqlx::query_as::<_, License>("SELECT * FROM licenses WHERE license_key = $1")
            .bind(license_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find license by key", e)
            })
    }

    async fn license_key_exists(&self, license_key: &str) -> AppResult<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM licenses WHERE license_key = $1)")
            .bind(license_key)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to check license key", e)
            })
    }

    async fn list_licenses(&self, query: &LicenseQuery) -> AppResult<Vec<License>> {
        const ORDER: &str = "ORDER BY software_name, license_key";
        let sql = match query {
            LicenseQuery::All => format!("SELECT * FROM licenses {ORDER}"),
            LicenseQuery::Active => format!("SELECT * FROM licenses WHERE active = TRUE {ORDER}"),
            LicenseQuery::Inactive => {
                format!("SELECT * FROM licenses WHERE active = FALSE {ORDER}")
            }
            LicenseQuery::Available => {
                format!("SELECT * FROM licenses WHERE used_seats < total_seats {ORDER}")
            }
            LicenseQuery::FullyUtilized => {
                format!("SELECT * FROM licenses WHERE used_seats >= total_seats {ORDER}")
            }
            LicenseQuery::BySoftwareName(_) => {
                format!("SELECT * FROM licenses WHERE software_name = $1 {ORDER}")
            }
            LicenseQuery::ExpiringBetween { .. } => format!(
                "SELECT * FROM licenses WHERE expiration_date BETWEEN $1 AND $2 {ORDER}"
            ),
            LicenseQuery::ExpiredBefore(_) => {
                format!("SELECT * FROM licenses WHERE expiration_date < $1 {ORDER}")
            }
        };

        let mut select = sqlx::query_as::<_, License>(&sql);
        match query {
            LicenseQuery::BySoftwareName(name) => select = select.bind(name.clone()),
            LicenseQuery::ExpiringBetween { from, to } => select = select.bind(*from).bind(*to),
            LicenseQuery::ExpiredBefore(instant) => select = select.bind(*instant),
            _ => {}
        }

        select
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list licenses", e))
    }

    async fn find_allocation(&self, id: AllocationId) -> AppResult<Option<Allocation>> {
        let sql = format!("SELECT {ALLOCATION_COLUMNS} FROM license_allocations WHERE id = $1");
        sqlx::query_as::<_, AllocationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find allocation", e))?
            .map(Allocation::try_from)
            .transpose()
    }

    async fn find_active_allocation(
        &self,
        license_id: LicenseId,
        holder: &AllocationHolder,
    ) -> AppResult<Option<Allocation>> {
        let sql = format!(
            "SELECT {ALLOCATION_COLUMNS} FROM license_allocations \
             WHERE license_id = $1 AND holder_kind = $2 \
             AND user_id IS NOT DISTINCT FROM $3 AND group_id IS NOT DISTINCT FROM $4 \
             AND revoked_at IS NULL"
        );
        sqlx::query_as::<_, AllocationRow>(&sql)
            .bind(license_id)
            .bind(holder.kind())
            .bind(holder.user_id())
            .bind(holder.group_id())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find active allocation", e)
            })?
            .map(Allocation::try_from)
            .transpose()
    }

    async fn list_allocations(&self, query: &AllocationQuery) -> AppResult<Vec<Allocation>> {
        let mut conditions = Vec::new();
        let mut param_idx = 1u32;

        if query.license_id.is_some() {
            conditions.push(format!("license_id = ${param_idx}"));
            param_idx += 1;
        }
        if query.user_id.is_some() {
            conditions.push(format!("user_id = ${param_idx}"));
            param_idx += 1;
        }
        if query.group_id.is_some() {
            conditions.push(format!("group_id = ${param_idx}"));
            param_idx += 1;
        }
        if query.holder_kind.is_some() {
            conditions.push(format!("holder_kind = ${param_idx}"));
        }
        if query.active_only {
            conditions.push("revoked_at IS NULL".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT {ALLOCATION_COLUMNS} FROM license_allocations {where_clause} \
             ORDER BY granted_at, id"
        );

        let mut select = sqlx::query_as::<_, AllocationRow>(&sql);
        if let Some(id) = query.license_id {
            select = select.bind(id);
        }
        if let Some(id) = query.user_id {
            select = select.bind(id);
        }
        if let Some(id) = query.group_id {
            select = select.bind(id);
        }
        if let Some(kind) = query.holder_kind {
            select = select.bind(kind);
        }

        select
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list allocations", e)
            })?
            .into_iter()
            .map(Allocation::try_from)
            .collect()
    }

    async fn search_history(
        &self,
        filter: &HistoryFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<HistoryEntry>> {
        let mut conditions = Vec::new();
        let mut param_idx = 1u32;

        if filter.license_id.is_some() {
            conditions.push(format!("license_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.user_id.is_some() {
            conditions.push(format!("user_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.group_id.is_some() {
            conditions.push(format!("group_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.action_type.is_some() {
            conditions.push(format!("action_type = ${param_idx}"));
            param_idx += 1;
        }
        if filter.from.is_some() {
            conditions.push(format!("timestamp >= ${param_idx}"));
            param_idx += 1;
        }
        if filter.to.is_some() {
            conditions.push(format!("timestamp <= ${param_idx}"));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM license_history {where_clause}");
        let select_sql = format!(
            "SELECT * FROM license_history {where_clause} \
             ORDER BY timestamp DESC, id DESC LIMIT ${param_idx} OFFSET ${}",
            param_idx + 1
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut select_query = sqlx::query_as::<_, HistoryEntry>(&select_sql);

        if let Some(id) = filter.license_id {
            count_query = count_query.bind(id);
            select_query = select_query.bind(id);
        }
        if let Some(id) = filter.user_id {
            count_query = count_query.bind(id);
            select_query = select_query.bind(id);
        }
        if let Some(id) = filter.group_id {
            count_query = count_query.bind(id);
            select_query = select_query.bind(id);
        }
        if let Some(action) = filter.action_type {
            count_query = count_query.bind(action);
            select_query = select_query.bind(action);
        }
        if let Some(from) = filter.from {
            count_query = count_query.bind(from);
            select_query = select_query.bind(from);
        }
        if let Some(to) = filter.to {
            count_query = count_query.bind(to);
            select_query = select_query.bind(to);
        }

        let total = count_query.fetch_one(&self.pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count history entries", e)
        })?;

        let entries = select_query
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to search history", e))?;

        Ok(PageResponse::new(
            entries,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    async fn commit(&self, changes: ChangeSet) -> AppResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        // Dropping `tx` on an early return rolls everything back.
        for write in changes.license_writes() {
            Self::apply_license(&mut *tx, write).await?;
        }
        for write in changes.allocation_writes() {
            Self::apply_allocation(&mut *tx, write).await?;
        }
        for entry in changes.history() {
            Self::append_history(&mut *tx, entry).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })?;

        debug!(
            licenses = changes.license_writes().len(),
            allocations = changes.allocation_writes().len(),
            history = changes.history().len(),
            "Committed change set"
        );
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }
}

/// Map a write failure, turning constraint violations into domain errors.
fn write_error(err: sqlx::Error, context: &str) -> AppError {
    let (kind, message) = match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            let message = match db.constraint() {
                Some("licenses_license_key_key") => "License key already exists".to_string(),
                Some("uq_active_user_allocation") => {
                    "User already has an active assignment on this license".to_string()
                }
                Some("uq_active_group_allocation") => {
                    "Group already has an active allocation on this license".to_string()
                }
                _ => format!("{context}: duplicate record"),
            };
            (ErrorKind::Conflict, message)
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            (ErrorKind::NotFound, format!("{context}: license not found"))
        }
        _ => (ErrorKind::Database, context.to_string()),
    };
    AppError::with_source(kind, message, err)
}
