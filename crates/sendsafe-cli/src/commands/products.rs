//! Products command - edit the line items of a document through a local JSON file.
//!
//! `pull` writes the items of a document to a file, `add`/`set`/`remove`
//! edit that file, and `push` saves the whole set back.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use sendsafe_core::{LineItemField, LineItemSet};

use super::extract::{format_items, OutputFormat};
use super::Context;

/// Arguments for the products command.
#[derive(Args)]
pub struct ProductsArgs {
    #[command(subcommand)]
    command: ProductsCommand,
}

#[derive(Subcommand)]
enum ProductsCommand {
    /// Fetch the line items of a document into a file
    Pull {
        /// Document id
        id: String,

        /// Output file (default: <id>.products.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extract items from the document XML instead of the stored list
        #[arg(long)]
        extract: bool,
    },

    /// Save the items in a file back to a document
    Push {
        /// Document id
        id: String,

        /// Items file
        file: PathBuf,
    },

    /// Show the items in a file
    Show {
        /// Items file
        file: PathBuf,
    },

    /// Append a blank item
    Add {
        /// Items file
        file: PathBuf,
    },

    /// Change one field of an item
    Set {
        /// Items file
        file: PathBuf,

        /// Item index
        index: u32,

        /// Field name (e.g. "description", "ncm", "unitValue")
        field: String,

        /// New value
        value: String,
    },

    /// Remove an item
    Remove {
        /// Items file
        file: PathBuf,

        /// Item index
        index: u32,
    },
}

pub async fn run(args: ProductsArgs, ctx: &Context) -> anyhow::Result<()> {
    match args.command {
        ProductsCommand::Pull {
            id,
            output,
            extract,
        } => {
            let client = ctx.client()?;
            let items = if extract {
                client.extract_products(&id).await?
            } else {
                LineItemSet::new(client.products(&id).await?.products)
            };

            let path = output.unwrap_or_else(|| PathBuf::from(format!("{}.products.json", id)));
            write_items(&path, &items)?;
            println!(
                "{} Wrote {} items to {}",
                style("✓").green(),
                items.len(),
                path.display()
            );
        }
        ProductsCommand::Push { id, file } => {
            let items = read_items(&file)?;
            let client = ctx.client()?;
            let response = client.save_products(&id, &items).await?;
            println!(
                "{} Saved {} items to {}",
                style("✓").green(),
                response.products_updated,
                id
            );
        }
        ProductsCommand::Show { file } => {
            let items = read_items(&file)?;
            print!("{}", format_items(items.items(), OutputFormat::Text)?);
        }
        ProductsCommand::Add { file } => {
            let mut items = read_items(&file)?;
            let index = items.add().index;
            write_items(&file, &items)?;
            println!("{} Added item {}", style("✓").green(), index);
        }
        ProductsCommand::Set {
            file,
            index,
            field,
            value,
        } => {
            let field: LineItemField = field.parse()?;
            let mut items = read_items(&file)?;
            items.set_field(index, field, value.as_str())?;
            write_items(&file, &items)?;
            println!(
                "{} Set {} of item {} to {:?}",
                style("✓").green(),
                field,
                index,
                value
            );
        }
        ProductsCommand::Remove { file, index } => {
            let mut items = read_items(&file)?;
            let removed = items.remove(index)?;
            write_items(&file, &items)?;
            println!(
                "{} Removed item {} ({})",
                style("✓").green(),
                removed.index,
                removed.description
            );
        }
    }

    Ok(())
}

fn read_items(path: &Path) -> anyhow::Result<LineItemSet> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&content)?)
}

fn write_items(path: &Path, items: &LineItemSet) -> anyhow::Result<()> {
    fs::write(path, serde_json::to_string_pretty(items)?)?;
    Ok(())
}
