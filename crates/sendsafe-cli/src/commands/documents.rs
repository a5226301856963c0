//! Document commands - list, show, edit, delete and download uploaded XML.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;

use sendsafe_core::models::document::XmlFile;

use super::{save_download, Context};

#[derive(Args)]
pub struct ListArgs {
    /// Page number
    #[arg(long, default_value = "1")]
    page: u32,

    /// Documents per page
    #[arg(long, default_value = "10")]
    limit: u32,

    /// Print the raw JSON response
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Document id
    id: String,

    /// Print the XML content as well
    #[arg(long)]
    content: bool,
}

#[derive(Args)]
pub struct EditArgs {
    /// Document id
    id: String,

    /// File holding the new XML content
    file: PathBuf,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Document id
    id: String,
}

#[derive(Args)]
pub struct DownloadArgs {
    /// Document id
    id: String,

    /// Output file (default: the name sent by the backend)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn list(args: ListArgs, ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let listing = client.list(args.page, args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if listing.files.is_empty() {
        println!("{} No documents found.", style("ℹ").blue());
        return Ok(());
    }

    for file in &listing.files {
        print_row(file);
    }

    let pages = listing.total.div_ceil(u64::from(listing.limit.max(1)));
    println!();
    println!(
        "Page {} of {} ({} documents)",
        listing.page,
        pages.max(1),
        listing.total
    );

    Ok(())
}

fn print_row(file: &XmlFile) {
    let uploaded = file
        .uploaded_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!(
        "{:<26} {:<40} {:>10} {}",
        style(&file.id).cyan(),
        file.display_name(),
        format_size(file.size),
        uploaded
    );
}

pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KIB {
        format!("{} B", bytes)
    } else if bytes_f < KIB * KIB {
        format!("{:.1} KB", bytes_f / KIB)
    } else {
        format!("{:.1} MB", bytes_f / (KIB * KIB))
    }
}

pub async fn show(args: ShowArgs, ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let file = client.get(&args.id).await?;

    println!("Id:       {}", file.id);
    println!("Name:     {}", file.display_name());
    println!("Stored:   {}", file.filename);
    println!("Size:     {}", format_size(file.size));
    if let Some(uploaded) = file.uploaded_at {
        println!("Uploaded: {}", uploaded.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(status) = &file.status {
        println!("Status:   {}", status);
    }

    if args.content {
        println!();
        println!("{}", file.xml_content.as_deref().unwrap_or_default());
    }

    Ok(())
}

pub async fn edit(args: EditArgs, ctx: &Context) -> anyhow::Result<()> {
    let content = fs::read_to_string(&args.file)?;
    if content.trim().is_empty() {
        anyhow::bail!("Refusing to save empty XML content from {}", args.file.display());
    }

    let client = ctx.client()?;
    let file = client.edit(&args.id, &content).await?;

    println!(
        "{} Updated {} ({})",
        style("✓").green(),
        file.display_name(),
        file.id
    );
    Ok(())
}

pub async fn delete(args: DeleteArgs, ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let response = client.delete(&args.id).await?;

    let message = if response.message.is_empty() {
        format!("Deleted {}", args.id)
    } else {
        response.message
    };
    println!("{} {}", style("✓").green(), message);
    Ok(())
}

pub async fn download(args: DownloadArgs, ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let download = client.download(&args.id).await?;
    save_download(&download, args.output.as_deref())?;
    Ok(())
}
