//! License lifecycle CLI commands.

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand, ValueEnum};

use crate::output::{self, LicenseRow, OutputFormat};
use licensehub_core::error::AppError;
use licensehub_core::types::LicenseId;
use licensehub_database::LicenseQuery;
use licensehub_entity::license::CreateLicense;
use licensehub_service::{Ledger, RequestContext};

/// Arguments for license commands
#[derive(Debug, Args)]
pub struct LicenseArgs {
    /// License subcommand
    #[command(subcommand)]
    pub command: LicenseCommand,
}

/// License subcommands
#[derive(Debug, Subcommand)]
pub enum LicenseCommand {
    /// Register a new license
    Create {
        /// Name of the licensed software
        #[arg(long)]
        software: String,
        /// Vendor license key (unique)
        #[arg(long)]
        key: String,
        /// Seats purchased
        #[arg(long)]
        seats: i32,
        /// Expiration date (RFC 3339)
        #[arg(long)]
        expires: Option<DateTime<Utc>>,
        /// Create the license flagged inactive
        #[arg(long)]
        inactive: bool,
        /// Description
        #[arg(long)]
        description: Option<String>,
    },
    /// Edit a license's attributes
    Update {
        /// License ID
        id: LicenseId,
        /// New software name
        #[arg(long)]
        software: Option<String>,
        /// New seat total
        #[arg(long)]
        seats: Option<i32>,
        /// New expiration date (RFC 3339)
        #[arg(long, conflicts_with = "no_expiration")]
        expires: Option<DateTime<Utc>>,
        /// Remove the expiration date
        #[arg(long)]
        no_expiration: bool,
        /// Set the active flag
        #[arg(long)]
        active: Option<bool>,
        /// New description
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a license and every allocation on it
    Delete {
        /// License ID
        id: LicenseId,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
    /// Show one license
    Show {
        /// License ID
        #[arg(required_unless_present = "key")]
        id: Option<LicenseId>,
        /// Look up by license key instead
        #[arg(long, conflicts_with = "id")]
        key: Option<String>,
    },
    /// List licenses
    List {
        /// Which licenses to list
        #[arg(long, value_enum, default_value = "all")]
        filter: ListFilter,
        /// Only licenses for this software
        #[arg(long)]
        software: Option<String>,
        /// Only licenses expiring within this many days
        #[arg(long)]
        expiring_within: Option<i64>,
        /// Only licenses already expired
        #[arg(long)]
        expired: bool,
        /// Only licenses using at least this percentage of their seats
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        min_usage: Option<u8>,
    },
}

/// Status filters for `license list`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFilter {
    /// Every license
    All,
    /// Active flag set
    Active,
    /// Active flag cleared
    Inactive,
    /// At least one free seat
    Available,
    /// No free seat
    Full,
}

/// Execute license commands
pub async fn execute(
    args: &LicenseArgs,
    ledger: &Ledger,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let licenses = ledger.licenses();

    match &args.command {
        LicenseCommand::Create {
            software,
            key,
            seats,
            expires,
            inactive,
            description,
        } => {
            let license = licenses
                .create(
                    ctx,
                    CreateLicense {
                        software_name: software.clone(),
                        license_key: key.clone(),
                        total_seats: *seats,
                        expiration_date: *expires,
                        active: !inactive,
                        description: description.clone(),
                    },
                )
                .await?;
            if format == OutputFormat::Table {
                output::print_success(&format!(
                    "Created license '{}' ({} seats)",
                    license.license_key, license.total_seats
                ));
            }
            output::print_license(&license, format);
        }
        LicenseCommand::Update {
            id,
            software,
            seats,
            expires,
            no_expiration,
            active,
            description,
        } => {
            let license = licenses
                .modify(ctx, *id, |data| {
                    if let Some(software) = software {
                        data.software_name = software.clone();
                    }
                    if let Some(seats) = seats {
                        data.total_seats = *seats;
                    }
                    if *no_expiration {
                        data.expiration_date = None;
                    } else if expires.is_some() {
                        data.expiration_date = *expires;
                    }
                    if let Some(active) = active {
                        data.active = *active;
                    }
                    if description.is_some() {
                        data.description = description.clone();
                    }
                })
                .await?;
            if format == OutputFormat::Table {
                output::print_success(&format!("Updated license '{}'", license.license_key));
            }
            output::print_license(&license, format);
        }
        LicenseCommand::Delete { id, force } => {
            let license = licenses.get(*id).await?;
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Delete license '{}' and release its {} seat(s)?",
                        license.license_key, license.used_seats
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = licenses.delete(ctx, *id).await?;
            output::print_success(&format!("Deleted license '{}'", deleted.license_key));
        }
        LicenseCommand::Show { id, key } => {
            let license = match (id, key) {
                (_, Some(key)) => licenses.find_by_key(key).await?,
                (Some(id), None) => licenses.get(*id).await?,
                (None, None) => {
                    return Err(AppError::validation("Either an ID or --key is required"));
                }
            };
            output::print_license(&license, format);
        }
        LicenseCommand::List {
            filter,
            software,
            expiring_within,
            expired,
            min_usage,
        } => {
            if let Some(threshold) = min_usage {
                let rows: Vec<LicenseRow> = licenses
                    .list_by_usage(*threshold)
                    .await?
                    .iter()
                    .map(LicenseRow::from)
                    .collect();
                output::print_list(&rows, format);
                return Ok(());
            }

            let now = Utc::now();
            let query = match (software, expiring_within, expired) {
                (Some(name), _, _) => LicenseQuery::BySoftwareName(name.clone()),
                (None, Some(days), _) => LicenseQuery::ExpiringBetween {
                    from: now,
                    to: now + Duration::days(*days),
                },
                (None, None, true) => LicenseQuery::ExpiredBefore(now),
                (None, None, false) => match filter {
                    ListFilter::All => LicenseQuery::All,
                    ListFilter::Active => LicenseQuery::Active,
                    ListFilter::Inactive => LicenseQuery::Inactive,
                    ListFilter::Available => LicenseQuery::Available,
                    ListFilter::Full => LicenseQuery::FullyUtilized,
                },
            };

            let rows: Vec<LicenseRow> = licenses
                .list(&query)
                .await?
                .iter()
                .map(LicenseRow::from)
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
