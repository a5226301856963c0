//! PDF command - render documents and fetch the rendered files.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use super::{save_download, Context};

#[derive(Args)]
pub struct PdfArgs {
    #[command(subcommand)]
    command: PdfCommand,
}

#[derive(Subcommand)]
enum PdfCommand {
    /// Render a document as DANFE (NF-e) or DACTE (CT-e)
    Convert {
        /// Document id
        xml_id: String,

        /// Download the rendered file right away
        #[arg(long)]
        download: bool,
    },

    /// Download a rendered file
    Download {
        /// PDF id
        pdf_id: String,

        /// Output file (default: the name sent by the backend)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ask for inline display instead of an attachment
        #[arg(long)]
        inline: bool,
    },

    /// List rendered files of a document
    List {
        /// Document id
        xml_id: String,
    },
}

pub async fn run(args: PdfArgs, ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;

    match args.command {
        PdfCommand::Convert { xml_id, download } => {
            let conversion = client.convert_pdf(&xml_id).await?;
            println!(
                "{} {} ({:?}, id {})",
                style("✓").green(),
                if conversion.message.is_empty() {
                    "Rendered"
                } else {
                    conversion.message.as_str()
                },
                conversion.pdf.kind,
                conversion.pdf.id
            );
            if download {
                let file = client.download_pdf(&conversion.pdf.id, false).await?;
                save_download(&file, None)?;
            }
        }
        PdfCommand::Download {
            pdf_id,
            output,
            inline,
        } => {
            let file = client.download_pdf(&pdf_id, inline).await?;
            save_download(&file, output.as_deref())?;
        }
        PdfCommand::List { xml_id } => {
            let pdfs = client.list_pdfs(&xml_id).await?;
            if pdfs.is_empty() {
                println!("{} No rendered files for {}.", style("ℹ").blue(), xml_id);
            }
            for pdf in &pdfs {
                let created = pdf
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{:<26} {:<6} {:<40} {}",
                    style(&pdf.id).cyan(),
                    format!("{:?}", pdf.kind).to_uppercase(),
                    pdf.filename,
                    created
                );
            }
        }
    }

    Ok(())
}
