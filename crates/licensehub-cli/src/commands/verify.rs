//! Seat invariant verification command.

use clap::Args;

use crate::output::{self, OutputFormat, SeatCheckRow};
use licensehub_core::error::AppError;
use licensehub_core::types::LicenseId;
use licensehub_service::Ledger;

/// Arguments for the verify command
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Check only this license
    #[arg(long)]
    pub license: Option<LicenseId>,
}

/// Execute the verify command. Fails when any license has drifted.
pub async fn execute(
    args: &VerifyArgs,
    ledger: &Ledger,
    format: OutputFormat,
) -> Result<(), AppError> {
    let checks = match args.license {
        Some(id) => vec![ledger.verifier().verify_license(id).await?],
        None => ledger.verifier().verify_all().await?,
    };

    let rows: Vec<SeatCheckRow> = checks.iter().map(SeatCheckRow::from).collect();
    output::print_list(&rows, format);

    let drifted = checks.iter().filter(|c| !c.is_consistent()).count();
    if drifted > 0 {
        return Err(AppError::internal(format!(
            "{drifted} license(s) failed seat verification"
        )));
    }

    if format == OutputFormat::Table {
        output::print_success(&format!("{} license(s) consistent", checks.len()));
    }
    Ok(())
}
