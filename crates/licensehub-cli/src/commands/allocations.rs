//! Allocation listing CLI commands.

use clap::{Args, Subcommand, ValueEnum};

use crate::output::{self, AllocationRow, OutputFormat};
use licensehub_core::error::AppError;
use licensehub_core::types::{GroupId, LicenseId, UserId};
use licensehub_entity::allocation::HolderKind;
use licensehub_service::Ledger;

/// Arguments for allocation commands
#[derive(Debug, Args)]
pub struct AllocationsArgs {
    /// Allocations subcommand
    #[command(subcommand)]
    pub command: AllocationsCommand,
}

/// Allocation subcommands
#[derive(Debug, Subcommand)]
pub enum AllocationsCommand {
    /// Allocations drawn from a license
    License {
        /// License ID
        id: LicenseId,
        /// Only one kind of holder
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        /// Include revoked allocations
        #[arg(long, conflicts_with = "kind")]
        all: bool,
    },
    /// Active assignments of a user
    User {
        /// User ID
        id: UserId,
    },
    /// Active allocations of a group
    Group {
        /// Group ID
        id: GroupId,
    },
}

/// Holder kind filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// User assignments
    User,
    /// Group allocations
    Group,
}

impl From<KindArg> for HolderKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::User => HolderKind::User,
            KindArg::Group => HolderKind::Group,
        }
    }
}

/// Execute allocation commands
pub async fn execute(
    args: &AllocationsArgs,
    ledger: &Ledger,
    format: OutputFormat,
) -> Result<(), AppError> {
    let assignments = ledger.assignments();

    let allocations = match &args.command {
        AllocationsCommand::License { id, all: true, .. } => {
            assignments.list_allocations_for_license(*id).await?
        }
        AllocationsCommand::License { id, kind, .. } => {
            assignments
                .list_active_for_license(*id, kind.map(HolderKind::from))
                .await?
        }
        AllocationsCommand::User { id } => assignments.list_active_for_user(*id).await?,
        AllocationsCommand::Group { id } => assignments.list_active_for_group(*id).await?,
    };

    let rows: Vec<AllocationRow> = allocations.iter().map(AllocationRow::from).collect();
    output::print_list(&rows, format);
    Ok(())
}
