//! Revocation CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, AllocationRow, OutputFormat};
use licensehub_core::error::AppError;
use licensehub_core::types::AllocationId;
use licensehub_service::{Ledger, RequestContext};

/// Arguments for revoke commands
#[derive(Debug, Args)]
pub struct RevokeArgs {
    /// Revoke subcommand
    #[command(subcommand)]
    pub command: RevokeCommand,
}

/// Revoke subcommands
#[derive(Debug, Subcommand)]
pub enum RevokeCommand {
    /// Revoke a user assignment
    User {
        /// Allocation ID
        allocation: AllocationId,
    },
    /// Revoke a group allocation
    Group {
        /// Allocation ID
        allocation: AllocationId,
    },
}

/// Execute revoke commands
pub async fn execute(
    args: &RevokeArgs,
    ledger: &Ledger,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let revoked = match &args.command {
        RevokeCommand::User { allocation } => {
            ledger.assignments().revoke_from_user(ctx, *allocation).await?
        }
        RevokeCommand::Group { allocation } => {
            ledger.assignments().revoke_from_group(ctx, *allocation).await?
        }
    };

    if format == OutputFormat::Table {
        output::print_success(&format!(
            "Revoked allocation {} ({} seat(s) freed)",
            revoked.id, revoked.seats
        ));
    }
    output::print_list(&[AllocationRow::from(&revoked)], format);
    Ok(())
}
