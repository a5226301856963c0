//! CLI application for NF-e/CT-e document uploads, line item editing and conversions.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{analytics, bulk, config, documents, extract, pdf, products, upload, Context};

/// sendsafe - Upload, inspect and convert NF-e/CT-e XML documents
#[derive(Parser)]
#[command(name = "sendsafe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "SENDSAFE_API_URL")]
    api_url: Option<String>,

    /// Bearer token (overrides the config file)
    #[arg(long, global = true, env = "SENDSAFE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload XML documents, one request per file
    Upload(upload::UploadArgs),

    /// List uploaded documents
    List(documents::ListArgs),

    /// Show one document
    Show(documents::ShowArgs),

    /// Replace the XML content of a document
    Edit(documents::EditArgs),

    /// Delete a document
    Delete(documents::DeleteArgs),

    /// Download the raw XML of a document
    Download(documents::DownloadArgs),

    /// Extract line items from a local XML file
    Extract(extract::ExtractArgs),

    /// Edit the line items of a document
    Products(products::ProductsArgs),

    /// Render documents as DANFE/DACTE PDFs
    Pdf(pdf::PdfArgs),

    /// Bulk conversions
    Bulk(bulk::BulkArgs),

    /// Usage analytics
    Analytics(analytics::AnalyticsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let ctx = Context {
        config_path: cli.config,
        api_url: cli.api_url,
        token: cli.token,
    };

    match cli.command {
        Commands::Upload(args) => upload::run(args, &ctx).await,
        Commands::List(args) => documents::list(args, &ctx).await,
        Commands::Show(args) => documents::show(args, &ctx).await,
        Commands::Edit(args) => documents::edit(args, &ctx).await,
        Commands::Delete(args) => documents::delete(args, &ctx).await,
        Commands::Download(args) => documents::download(args, &ctx).await,
        Commands::Extract(args) => extract::run(args, &ctx),
        Commands::Products(args) => products::run(args, &ctx).await,
        Commands::Pdf(args) => pdf::run(args, &ctx).await,
        Commands::Bulk(args) => bulk::run(args, &ctx).await,
        Commands::Analytics(args) => analytics::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx),
    }
}
