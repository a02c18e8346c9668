//! License history CLI commands.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use super::PageArgs;
use crate::output::{self, HistoryRow, OutputFormat};
use licensehub_core::error::AppError;
use licensehub_core::types::pagination::PageResponse;
use licensehub_core::types::{GroupId, LicenseId, UserId};
use licensehub_entity::history::{ActionType, HistoryEntry};
use licensehub_service::Ledger;

/// Arguments for history commands
#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// History subcommand
    #[command(subcommand)]
    pub command: HistoryCommand,
}

/// History subcommands
#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// History of one license (also after deletion)
    License {
        /// License ID
        id: LicenseId,
        #[command(flatten)]
        page: PageArgs,
    },
    /// History involving one user
    User {
        /// User ID
        id: UserId,
        #[command(flatten)]
        page: PageArgs,
    },
    /// History involving one group
    Group {
        /// Group ID
        id: GroupId,
        #[command(flatten)]
        page: PageArgs,
    },
    /// History of one action type, e.g. LICENSE_ASSIGNED_TO_USER
    Action {
        /// Action type
        action: ActionType,
        #[command(flatten)]
        page: PageArgs,
    },
    /// History within a time range
    Between {
        /// Range start (RFC 3339)
        #[arg(long)]
        from: DateTime<Utc>,
        /// Range end (RFC 3339)
        #[arg(long)]
        to: DateTime<Utc>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Most recent entries across all licenses
    Recent {
        /// Number of entries (defaults to ledger.recent_history_limit)
        #[arg(short, long)]
        limit: Option<u64>,
    },
}

/// Execute history commands
pub async fn execute(
    args: &HistoryArgs,
    ledger: &Ledger,
    format: OutputFormat,
) -> Result<(), AppError> {
    let audit = ledger.audit();

    let response = match &args.command {
        HistoryCommand::License { id, page } => audit.for_license(*id, &page.request()).await?,
        HistoryCommand::User { id, page } => audit.for_user(*id, &page.request()).await?,
        HistoryCommand::Group { id, page } => audit.for_group(*id, &page.request()).await?,
        HistoryCommand::Action { action, page } => {
            audit.by_action(*action, &page.request()).await?
        }
        HistoryCommand::Between { from, to, page } => {
            audit.between(*from, *to, &page.request()).await?
        }
        HistoryCommand::Recent { limit } => {
            let entries = audit.recent(*limit).await?;
            print_entries(&entries, format);
            return Ok(());
        }
    };

    print_page(&response, format);
    Ok(())
}

fn print_entries(entries: &[HistoryEntry], format: OutputFormat) {
    let rows: Vec<HistoryRow> = entries.iter().map(HistoryRow::from).collect();
    output::print_list(&rows, format);
}

fn print_page(response: &PageResponse<HistoryEntry>, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(response),
        OutputFormat::Table => {
            print_entries(&response.items, format);
            println!(
                "Page {} of {} ({} entries)",
                response.page, response.total_pages, response.total_items
            );
        }
    }
}
