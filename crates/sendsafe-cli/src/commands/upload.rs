//! Upload command - send XML documents to the backend.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use sendsafe_core::models::document::XmlFile;
use sendsafe_core::upload::{BatchUploadSummary, UploadOutcome, UploadStatus};
use sendsafe_core::{UploadFile, UploadLimits, UploadObserver};

use super::Context;

/// Arguments for the upload command.
#[derive(Args)]
pub struct UploadArgs {
    /// Input files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write a CSV report of the batch
    #[arg(long)]
    report: Option<PathBuf>,
}

/// Expand files and glob patterns, keeping the order given. A file matched
/// more than once is listed at its first position only.
pub fn collect_files(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();
    for input in inputs {
        let matched: Vec<PathBuf> = glob(input)?.filter_map(|r| r.ok()).collect();
        if matched.is_empty() {
            anyhow::bail!("No matching files found for pattern: {}", input);
        }
        files.extend(matched.into_iter().filter(|path| seen.insert(path.clone())));
    }
    Ok(files)
}

/// Read every file into memory.
pub fn read_files(paths: &[PathBuf]) -> anyhow::Result<Vec<UploadFile>> {
    paths
        .iter()
        .map(|path| {
            UploadFile::from_path(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))
        })
        .collect()
}

/// Advances a progress bar as uploads settle.
struct ProgressObserver {
    bar: ProgressBar,
}

impl UploadObserver<XmlFile> for ProgressObserver {
    fn on_settled(&mut self, outcome: &UploadOutcome<XmlFile>) {
        match &outcome.status {
            UploadStatus::Succeeded(file) => debug!("{} stored as {}", outcome.file_name, file.id),
            UploadStatus::Failed(message) => {
                self.bar
                    .println(format!("  {} {}: {}", style("✗").red(), outcome.file_name, message));
            }
        }
        self.bar.set_message(outcome.file_name.clone());
        self.bar.inc(1);
    }

    fn on_uploaded(&mut self, uploaded: &[XmlFile]) {
        self.bar.println(format!(
            "{} {} file(s) uploaded successfully",
            style("✓").green(),
            uploaded.len()
        ));
    }

    fn on_failed(&mut self, failures: usize) {
        self.bar.println(format!(
            "{} {} file(s) failed to upload",
            style("✗").red(),
            failures
        ));
    }
}

pub async fn run(args: UploadArgs, ctx: &Context) -> anyhow::Result<()> {
    let start = Instant::now();
    let client = ctx.client()?;

    let paths = collect_files(&args.inputs)?;
    let files = read_files(&paths)?;
    let limits = UploadLimits::interactive(client.upload_config());

    // Reject the whole batch before anything is sent
    limits.preflight(&files)?;

    println!(
        "{} Uploading {} files to {}",
        style("ℹ").blue(),
        files.len(),
        client.base_url()
    );

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut observer = ProgressObserver { bar };
    let summary = client.upload_batch(files, limits, &mut observer).await?;
    observer.bar.finish_with_message("Complete");

    if let Some(report) = &args.report {
        write_report(report, &summary)?;
        println!(
            "{} Report written to {}",
            style("✓").green(),
            report.display()
        );
    }

    println!();
    println!(
        "{} Uploaded {} of {} files in {:?}",
        style("✓").green(),
        summary.success_count(),
        summary.total(),
        start.elapsed()
    );

    for file in &summary.uploaded {
        println!("  {} {}", style(&file.id).cyan(), file.display_name());
    }

    if !summary.failures.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for failure in &summary.failures {
            println!("  - {}: {}", failure.file_name, failure.error_message);
        }
    }

    if summary.uploaded.is_empty() {
        anyhow::bail!("No file was uploaded");
    }

    Ok(())
}

fn write_report(path: &Path, summary: &BatchUploadSummary<XmlFile>) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["filename", "status", "id", "error"])?;

    for file in &summary.uploaded {
        wtr.write_record([file.display_name(), "success", &file.id, ""])?;
    }
    for failure in &summary.failures {
        wtr.write_record([
            failure.file_name.as_str(),
            "error",
            "",
            failure.error_message.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
