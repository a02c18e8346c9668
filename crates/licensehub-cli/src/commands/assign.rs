//! Seat assignment CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, AllocationRow, OutputFormat};
use licensehub_core::error::AppError;
use licensehub_core::types::{GroupId, LicenseId, UserId};
use licensehub_service::{AssignGroupRequest, AssignUserRequest, Ledger, RequestContext};

/// Arguments for assign commands
#[derive(Debug, Args)]
pub struct AssignArgs {
    /// Assign subcommand
    #[command(subcommand)]
    pub command: AssignCommand,
}

/// Assign subcommands
#[derive(Debug, Subcommand)]
pub enum AssignCommand {
    /// Assign one seat to a user
    User {
        /// License ID
        #[arg(long)]
        license: LicenseId,
        /// User ID
        #[arg(long)]
        user: UserId,
        /// Notes stored with the assignment
        #[arg(long)]
        notes: Option<String>,
    },
    /// Allocate a block of seats to a group
    Group {
        /// License ID
        #[arg(long)]
        license: LicenseId,
        /// Group ID
        #[arg(long)]
        group: GroupId,
        /// Seats to allocate
        #[arg(long)]
        seats: i32,
        /// Notes stored with the allocation
        #[arg(long)]
        notes: Option<String>,
    },
}

/// Execute assign commands
pub async fn execute(
    args: &AssignArgs,
    ledger: &Ledger,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let allocation = match &args.command {
        AssignCommand::User {
            license,
            user,
            notes,
        } => {
            ledger
                .assignments()
                .assign_to_user(
                    ctx,
                    AssignUserRequest {
                        license_id: *license,
                        user_id: *user,
                        notes: notes.clone(),
                    },
                )
                .await?
        }
        AssignCommand::Group {
            license,
            group,
            seats,
            notes,
        } => {
            ledger
                .assignments()
                .assign_to_group(
                    ctx,
                    AssignGroupRequest {
                        license_id: *license,
                        group_id: *group,
                        seats: *seats,
                        notes: notes.clone(),
                    },
                )
                .await?
        }
    };

    if format == OutputFormat::Table {
        output::print_success(&format!(
            "Granted {} seat(s) as allocation {}",
            allocation.seats, allocation.id
        ));
    }
    output::print_list(&[AllocationRow::from(&allocation)], format);
    Ok(())
}
