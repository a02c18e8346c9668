//! Store and directory selection from configuration.

use std::sync::Arc;

use tracing::{info, warn};

use licensehub_core::config::{AppConfig, StoreBackend};
use licensehub_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::directory::{Directory, MemoryDirectory, PgDirectory};
use crate::migration::run_migrations;
use crate::store::{LedgerStore, MemoryLedgerStore, PgLedgerStore};

/// The persistence pair every ledger service runs on.
#[derive(Debug, Clone)]
pub struct LedgerBackend {
    /// Licenses, allocations, and history.
    pub store: Arc<dyn LedgerStore>,
    /// Users and groups.
    pub directory: Arc<dyn Directory>,
}

impl LedgerBackend {
    /// Open the backend named by `config.store.backend`.
    pub async fn open(config: &AppConfig) -> AppResult<Self> {
        info!(backend = %config.store.backend, "Opening ledger store");

        match config.store.backend {
            StoreBackend::Memory => {
                warn!("Using in-memory ledger store; all state is lost on exit");
                Ok(Self::from_parts(
                    Arc::new(MemoryLedgerStore::new()),
                    Arc::new(MemoryDirectory::new()),
                ))
            }
            StoreBackend::Postgres => {
                let pool = DatabasePool::connect(&config.database).await?;
                if config.store.run_migrations {
                    run_migrations(pool.pool()).await?;
                }
                let pool = pool.into_pool();
                Ok(Self {
                    store: Arc::new(PgLedgerStore::new(pool.clone())),
                    directory: Arc::new(PgDirectory::new(pool)),
                })
            }
        }
    }

    /// Wrap an existing store and directory.
    pub fn from_parts(store: Arc<dyn LedgerStore>, directory: Arc<dyn Directory>) -> Self {
        Self { store, directory }
    }
}
