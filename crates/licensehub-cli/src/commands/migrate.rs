//! Database migration management commands.

use clap::{Args, Subcommand};

use crate::output::{self, MigrationRow, OutputFormat};
use licensehub_core::config::{AppConfig, StoreBackend};
use licensehub_core::error::AppError;
use licensehub_database::{DatabasePool, migration};

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Show which migrations are applied
    Status,
}

/// Execute migration commands
pub async fn execute(
    args: &MigrateArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    if config.store.backend == StoreBackend::Memory {
        output::print_warning("The memory store has no schema; nothing to migrate.");
        return Ok(());
    }

    let pool = DatabasePool::connect(&config.database).await?;

    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            let applied = migration::run_migrations(pool.pool()).await?;
            if applied == 0 {
                output::print_success("Schema already up to date.");
            } else {
                output::print_success(&format!("Applied {applied} migration(s)."));
            }
        }
        MigrateCommand::Status => {
            let rows: Vec<MigrationRow> = migration::migration_status(pool.pool())
                .await?
                .iter()
                .map(MigrationRow::from)
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
