//! PostgreSQL connection pool management.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use licensehub_core::config::DatabaseConfig;
use licensehub_core::error::{AppError, ErrorKind};

/// Connection pool for the PostgreSQL ledger backend.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Open the pool the ledger store and directory share.
    ///
    /// Fails fast if the server is unreachable within
    /// `connect_timeout_seconds`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let endpoint = redact_url(&config.url);
        debug!(
            endpoint = %endpoint,
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_seconds = config.connect_timeout_seconds,
            "Opening ledger database pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to ledger database at {endpoint}: {e}"),
                    e,
                )
            })?;

        info!(
            endpoint = %endpoint,
            open_connections = pool.size(),
            "Ledger database connected"
        );
        Ok(Self { pool })
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Return the underlying sqlx pool (consuming self).
    pub fn into_pool(self) -> PgPool {
        self.pool
    }
}

/// Hide credentials and connection parameters of a database URL.
///
/// Query parameters can carry `password` or key paths, so they are dropped.
fn redact_url(url: &str) -> String {
    let base = url.split_once('?').map_or(url, |(base, _)| base);
    let Some(at_pos) = base.rfind('@') else {
        return base.to_string();
    };
    let scheme_end = base.find("://").map_or(0, |p| p + 3);
    match base[scheme_end..at_pos].split_once(':') {
        Some((user, _)) => format!("{}{user}:****@{}", &base[..scheme_end], &base[at_pos + 1..]),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("postgres://licensehub:secret@db:5432/ledger"),
            "postgres://licensehub:****@db:5432/ledger"
        );
        assert_eq!(
            redact_url("postgres://db:5432/ledger"),
            "postgres://db:5432/ledger"
        );
        assert_eq!(
            redact_url("postgres://ops@db/ledger?sslmode=require&password=hunter2"),
            "postgres://ops@db/ledger"
        );
        assert_eq!(
            redact_url("postgres://ops:p@ss@db/ledger"),
            "postgres://ops:****@db/ledger"
        );
    }
}
