//! Directory lookups against the `users` and `user_groups` tables.

use async_trait::async_trait;
use sqlx::PgPool;

use licensehub_core::error::{AppError, ErrorKind};
use licensehub_core::result::AppResult;
use licensehub_core::types::{GroupId, UserId};
use licensehub_entity::directory::{DirectoryGroup, DirectoryUser};

use super::Directory;

/// Directory over PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    /// Create a new directory over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_user(&self, id: UserId) -> AppResult<Option<DirectoryUser>> {
        sqlx::query_as::<_, DirectoryUser>("SELECT id, username, active FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user", e))
    }

    async fn find_group(&self, id: GroupId) -> AppResult<Option<DirectoryGroup>> {
        sqlx::query_as::<_, DirectoryGroup>(
            "SELECT id, name, active FROM user_groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find group", e))
    }
}
