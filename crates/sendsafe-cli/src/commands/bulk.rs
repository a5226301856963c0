//! Bulk command - large conversions tracked by the backend.

use clap::{Args, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use sendsafe_core::models::document::{BulkConversion, BulkStatus};
use sendsafe_core::{ApiClient, BULK_POLL_INTERVAL};

use super::upload::{collect_files, read_files};
use super::Context;

#[derive(Args)]
pub struct BulkArgs {
    #[command(subcommand)]
    command: BulkCommand,
}

#[derive(Subcommand)]
enum BulkCommand {
    /// Start a bulk conversion
    Convert {
        /// Input files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Follow progress until the conversion finishes
        #[arg(long)]
        watch: bool,
    },

    /// Show the progress of a conversion
    Status {
        /// Conversion id
        id: String,

        /// Follow progress until the conversion finishes
        #[arg(long)]
        watch: bool,
    },

    /// List past conversions
    History,

    /// Cancel a running conversion
    Cancel {
        /// Conversion id
        id: String,
    },
}

pub async fn run(args: BulkArgs, ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;

    match args.command {
        BulkCommand::Convert { inputs, watch } => {
            let files = read_files(&collect_files(&inputs)?)?;
            let started = client.start_bulk_conversion(&files).await?;
            println!(
                "{} Started conversion {} with {} files",
                style("✓").green(),
                style(&started.conversion_id).cyan(),
                files.len()
            );
            if watch {
                watch_conversion(&client, &started.conversion_id).await?;
            }
        }
        BulkCommand::Status { id, watch } => {
            if watch {
                watch_conversion(&client, &id).await?;
            } else {
                print_conversion(&client.bulk_status(&id).await?);
            }
        }
        BulkCommand::History => {
            let history = client.bulk_history().await?;
            if history.conversions.is_empty() {
                println!("{} No bulk conversions yet.", style("ℹ").blue());
            }
            for conversion in &history.conversions {
                print_conversion(conversion);
            }
        }
        BulkCommand::Cancel { id } => {
            let response = client.cancel_bulk(&id).await?;
            let message = if response.message.is_empty() {
                format!("Cancelled {}", id)
            } else {
                response.message
            };
            println!("{} {}", style("✓").green(), message);
        }
    }

    Ok(())
}

async fn watch_conversion(client: &ApiClient, id: &str) -> anyhow::Result<()> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}% {msg}")?
            .progress_chars("##-"),
    );

    let finished = client
        .wait_for_bulk(id, BULK_POLL_INTERVAL, |c| {
            bar.set_position(u64::from(c.progress.min(100)));
            bar.set_message(format!(
                "{}/{} files, {} errors",
                c.processed_files, c.total_files, c.error_files
            ));
        })
        .await?;
    bar.finish_with_message(finished.status.to_string());

    print_conversion(&finished);
    if finished.status == BulkStatus::Failed {
        anyhow::bail!("Bulk conversion {} failed", id);
    }
    Ok(())
}

fn print_conversion(conversion: &BulkConversion) {
    let status = match conversion.status {
        BulkStatus::Completed => style(conversion.status.to_string()).green(),
        BulkStatus::Failed => style(conversion.status.to_string()).red(),
        BulkStatus::Cancelled => style(conversion.status.to_string()).yellow(),
        BulkStatus::Pending | BulkStatus::Processing => style(conversion.status.to_string()).blue(),
    };
    let created = conversion
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    println!(
        "{:<26} {:<10} {:>3}% {}/{} files, {} errors {}",
        style(&conversion.id).cyan(),
        status,
        conversion.progress,
        conversion.processed_files,
        conversion.total_files,
        conversion.error_files,
        created
    );
}
