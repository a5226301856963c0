//! Analytics command - usage summaries from the backend.

use clap::{Args, Subcommand};
use console::style;
use serde::Serialize;

use sendsafe_core::models::analytics::AnalyticsPeriod;

use super::Context;

#[derive(Args)]
pub struct AnalyticsArgs {
    /// Print raw JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: AnalyticsCommand,
}

#[derive(Subcommand)]
enum AnalyticsCommand {
    /// Dashboard totals
    Summary,

    /// Uploads per day
    Timeline {
        /// Period: 7d, 30d, 90d or 1y
        #[arg(long, default_value = "7d")]
        period: AnalyticsPeriod,
    },

    /// Most frequent products
    TopProducts {
        /// Number of products
        #[arg(long, default_value = "10")]
        limit: u32,
    },

    /// Bulk conversion volume per day
    BulkVolume {
        /// Period: 7d, 30d, 90d or 1y
        #[arg(long, default_value = "7d")]
        period: AnalyticsPeriod,
    },

    /// Share of items per CFOP
    Cfop,

    /// Documents per processing status
    XmlStatus,
}

pub async fn run(args: AnalyticsArgs, ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let json = args.json;

    match args.command {
        AnalyticsCommand::Summary => {
            let summary = client.dashboard_summary().await?;
            if json {
                return print_json(&summary);
            }
            println!("Documents:       {}", summary.total_xmls);
            println!("Products:        {}", summary.total_products);
            println!("PDFs:            {}", summary.total_pdfs);
            println!("Recent uploads:  {}", summary.recent_uploads);
            println!("With errors:     {}", style(summary.error_xmls).red());
            println!("Success rate:    {:.1}%", summary.success_rate);
            if let Some(last) = &summary.last_upload {
                println!("Last upload:     {} ({})", last.original_name, last.created_at);
            }
        }
        AnalyticsCommand::Timeline { period } => {
            let points = client.uploads_timeline(period).await?;
            if json {
                return print_json(&points);
            }
            for point in &points {
                println!(
                    "{}  {:>5} uploads  {:>5} processed  {:>5} errors",
                    point.date, point.uploads, point.processed, point.errors
                );
            }
        }
        AnalyticsCommand::TopProducts { limit } => {
            let products = client.top_products(limit).await?;
            if json {
                return print_json(&products);
            }
            for (rank, product) in products.iter().enumerate() {
                println!(
                    "{:>3}. {:<40} {:>6} docs  R$ {:.2}",
                    rank + 1,
                    product.name,
                    product.count,
                    product.total_value
                );
            }
        }
        AnalyticsCommand::BulkVolume { period } => {
            let points = client.bulk_volume(period).await?;
            if json {
                return print_json(&points);
            }
            for point in &points {
                println!(
                    "{}  {:>3} conversions  {:>5}/{} files  {:>4} errors",
                    point.date,
                    point.conversions,
                    point.processed_files,
                    point.total_files,
                    point.error_files
                );
            }
        }
        AnalyticsCommand::Cfop => {
            let shares = client.cfop_distribution().await?;
            if json {
                return print_json(&shares);
            }
            for share in &shares {
                println!(
                    "{:<6} {:>6} items  {:>5.1}%  {}",
                    share.cfop,
                    share.count,
                    share.percentage,
                    share.description.as_deref().unwrap_or_default()
                );
            }
        }
        AnalyticsCommand::XmlStatus => {
            let counts = client.xml_status().await?;
            if json {
                return print_json(&counts);
            }
            for count in &counts {
                println!(
                    "{:<12} {:>6}  {:>5.1}%",
                    count.status, count.count, count.percentage
                );
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
