//! Extract command - read line items from a local XML file.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use sendsafe_core::extract::amounts::format_amount;
use sendsafe_core::{LineItem, LineItemExtractor, LineItemField, LineItemSet};

use super::Context;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input XML file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub fn run(args: ExtractArgs, ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.config()?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let text = fs::read_to_string(&args.input)?;

    let extractor = LineItemExtractor::new().with_config(&config.extraction);
    let result = extractor.extract_detailed(&text);

    for warning in &result.warnings {
        eprintln!("{} {}", style("⚠").yellow(), warning);
    }
    info!(
        "Extracted {} items in {}ms",
        result.items.len(),
        result.processing_time_ms
    );

    let output = format_items(&result.items, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if let Some(schema) = result.schema {
        eprintln!(
            "{} {} items read with the {:?} schema",
            style("ℹ").blue(),
            result.items.len(),
            schema
        );
    }

    Ok(())
}

pub fn format_items(items: &[LineItem], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(items)?),
        OutputFormat::Csv => format_items_csv(items),
        OutputFormat::Text => Ok(format_items_text(items)),
    }
}

fn format_items_csv(items: &[LineItem]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["index"];
    header.extend(LineItemField::ALL.iter().map(|f| f.name()));
    wtr.write_record(&header)?;

    for item in items {
        let mut record = vec![item.index.to_string()];
        record.extend(LineItemField::ALL.iter().map(|f| item.field(*f).to_string()));
        wtr.write_record(&record)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_items_text(items: &[LineItem]) -> String {
    let mut output = String::new();

    for item in items {
        output.push_str(&format!("#{} {} {}\n", item.index + 1, item.code, item.description));
        output.push_str(&format!(
            "   NCM {}  CFOP {}\n",
            or_dash(&item.tax_code),
            or_dash(&item.operation_code)
        ));
        output.push_str(&format!(
            "   {} {} x {} = {}\n",
            item.quantity, item.unit, item.unit_value, item.total_value
        ));
        output.push_str(&format!(
            "   BC {}  ICMS {}  IPI {}\n",
            item.tax_base_value, item.icms_value, item.ipi_value
        ));
    }

    let totals = LineItemSet::new(items.to_vec()).totals();
    output.push('\n');
    output.push_str(&format!("Items: {}\n", items.len()));
    output.push_str(&format!("Total: R$ {}\n", format_amount(totals.total_value)));
    output.push_str(&format!("ICMS:  R$ {}\n", format_amount(totals.icms_value)));
    output.push_str(&format!("IPI:   R$ {}\n", format_amount(totals.ipi_value)));
    if totals.unparsed > 0 {
        output.push_str(&format!("({} items with unreadable amounts left out)\n", totals.unparsed));
    }

    output
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
