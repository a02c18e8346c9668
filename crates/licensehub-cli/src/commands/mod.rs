//! CLI command definitions and dispatch.

pub mod allocations;
pub mod assign;
pub mod history;
pub mod license;
pub mod migrate;
pub mod revoke;
pub mod verify;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use licensehub_core::config::AppConfig;
use licensehub_core::error::AppError;
use licensehub_service::{Ledger, RequestContext};

/// LicenseHub: software license seat allocation and audit
#[derive(Debug, Parser)]
#[command(name = "licensehub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "LICENSEHUB_CONFIG", default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Name recorded as the actor in license history
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// License lifecycle
    License(license::LicenseArgs),
    /// Assign seats to users and groups
    Assign(assign::AssignArgs),
    /// Revoke user assignments and group allocations
    Revoke(revoke::RevokeArgs),
    /// List allocations
    Allocations(allocations::AllocationsArgs),
    /// License history
    History(history::HistoryArgs),
    /// Check stored seat counters against active allocations
    Verify(verify::VerifyArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        tracing::debug!(command = ?self.command, backend = %config.store.backend, "Executing command");

        if let Commands::Migrate(args) = &self.command {
            return migrate::execute(args, config, self.format).await;
        }

        let ledger = Ledger::open(config).await?;
        let ctx = self.context(&ledger);

        match &self.command {
            Commands::Migrate(_) => Ok(()),
            Commands::License(args) => license::execute(args, &ledger, &ctx, self.format).await,
            Commands::Assign(args) => assign::execute(args, &ledger, &ctx, self.format).await,
            Commands::Revoke(args) => revoke::execute(args, &ledger, &ctx, self.format).await,
            Commands::Allocations(args) => allocations::execute(args, &ledger, self.format).await,
            Commands::History(args) => history::execute(args, &ledger, self.format).await,
            Commands::Verify(args) => verify::execute(args, &ledger, self.format).await,
        }
    }

    fn context(&self, ledger: &Ledger) -> RequestContext {
        ledger.context(self.actor.as_deref())
    }
}

/// Paging flags shared by history listings.
#[derive(Debug, Clone, Copy, clap::Args)]
pub struct PageArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: u64,
    /// Entries per page
    #[arg(long, default_value = "25")]
    pub per_page: u64,
}

impl PageArgs {
    /// Convert into a store page request.
    pub fn request(&self) -> licensehub_core::types::pagination::PageRequest {
        licensehub_core::types::pagination::PageRequest::new(self.page, self.per_page)
    }
}
