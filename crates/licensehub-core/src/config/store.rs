//! Resource store selection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which resource store backs the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local tables; state is lost on exit.
    Memory,
    /// PostgreSQL via sqlx.
    #[default]
    Postgres,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// Resource store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Whether to apply pending migrations when opening a PostgreSQL store.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            run_migrations: default_run_migrations(),
        }
    }
}

fn default_run_migrations() -> bool {
    true
}
