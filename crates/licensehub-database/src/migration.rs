//! Ledger schema migrations.

use std::collections::HashSet;

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::{info, warn};

use licensehub_core::error::{AppError, ErrorKind};
use licensehub_core::result::AppResult;

static LEDGER_SCHEMA: Migrator = sqlx::migrate!("../../migrations");

/// One ledger schema migration and whether the database has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Migration version (its timestamp prefix).
    pub version: i64,
    /// Human-readable name taken from the file name.
    pub description: String,
    /// Whether the migration has been applied successfully.
    pub applied: bool,
}

/// Every known migration, oldest first, with its applied state.
pub async fn migration_status(pool: &PgPool) -> AppResult<Vec<MigrationStatus>> {
    let applied = applied_versions(pool).await?;
    Ok(LEDGER_SCHEMA
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| MigrationStatus {
            version: m.version,
            description: m.description.to_string(),
            applied: applied.contains(&m.version),
        })
        .collect())
}

/// Apply pending ledger migrations. Returns how many were applied.
pub async fn run_migrations(pool: &PgPool) -> AppResult<usize> {
    let pending = migration_status(pool)
        .await?
        .into_iter()
        .filter(|m| !m.applied)
        .count();
    if pending == 0 {
        info!("Ledger schema is up to date");
        return Ok(0);
    }

    info!(pending = pending, "Applying ledger schema migrations");
    LEDGER_SCHEMA.run(pool).await.map_err(|e| {
        warn!(error = %e, "Ledger schema migration failed");
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to run migrations: {e}"),
            e,
        )
    })?;

    info!(applied = pending, "Ledger schema migrated");
    Ok(pending)
}

/// Versions recorded by sqlx. A fresh database has no bookkeeping table yet.
async fn applied_versions(pool: &PgPool) -> AppResult<HashSet<i64>> {
    let tracked: bool =
        sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to inspect schema", e)
            })?;
    if !tracked {
        return Ok(HashSet::new());
    }

    let versions: Vec<i64> =
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to read applied migrations", e)
            })?;
    Ok(versions.into_iter().collect())
}
