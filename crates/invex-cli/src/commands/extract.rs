//! Extract command - extract fields from a single document.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invex_core::models::pattern::FieldType;
use invex_core::{ExtractionResult, InvoiceExtractor, StructuredData};

use crate::decode;

use super::{build_engine, load_config};

/// Header fields in output column order.
pub const CSV_COLUMNS: &[FieldType] = &[
    FieldType::PiNo,
    FieldType::CodeNo,
    FieldType::InvoiceDate,
    FieldType::DelDate,
    FieldType::CustomerName,
    FieldType::Address,
    FieldType::CustomerPhone,
    FieldType::CustomerTel,
    FieldType::CustomerEmail,
    FieldType::Reference,
    FieldType::PlateNumber,
    FieldType::AttendedBy,
    FieldType::ServiceDescription,
    FieldType::Amount,
    FieldType::NetValue,
    FieldType::VatAmount,
    FieldType::GrossValue,
];

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input document (text, PDF, or decoded JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Structured decoder output to merge with the text extraction
    #[arg(long)]
    structured: Option<PathBuf>,

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

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Extracting fields from {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Decoding document...");

    let mut document = decode::decode_file(&args.input);
    if let Some(path) = &args.structured {
        let content = fs::read_to_string(path)?;
        let data: StructuredData = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid structured data in {}: {}", path.display(), e))?;
        document.structured_data = Some(data);
    }

    pb.set_message("Extracting fields...");
    let engine = build_engine(config);
    let result = engine.extract_document(&document);

    pb.finish_and_clear();

    let output = format_result(&result, args.format)?;

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

    debug!("Total processing time: {:?}", start.elapsed());

    if let Some(error) = &result.error {
        anyhow::bail!("Extraction failed: {}", error);
    }

    if let Some(service) = &result.matched_service {
        eprintln!(
            "{} Matched service: {} ({} min)",
            style("ℹ").blue(),
            service,
            result.estimated_minutes.unwrap_or_default()
        );
    }

    Ok(())
}

pub fn format_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<&str> = CSV_COLUMNS.iter().map(|f| f.as_str()).collect();
    header.extend(["matched_service", "estimated_minutes", "items", "error"]);
    wtr.write_record(&header)?;

    let mut row: Vec<String> = CSV_COLUMNS
        .iter()
        .map(|f| result.field(*f).unwrap_or_default().to_string())
        .collect();
    row.push(result.matched_service.clone().unwrap_or_default());
    row.push(
        result
            .estimated_minutes
            .map(|m| m.to_string())
            .unwrap_or_default(),
    );
    row.push(result.items.len().to_string());
    row.push(result.error.clone().unwrap_or_default());
    wtr.write_record(&row)?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &ExtractionResult) -> String {
    let mut output = String::new();

    if let Some(error) = &result.error {
        output.push_str(&format!("Error: {}\n", error));
        return output;
    }

    for field in CSV_COLUMNS {
        if let Some(value) = result.field(*field) {
            output.push_str(&format!("{:<20} {}\n", format!("{}:", field), value));
        }
    }

    if let Some(service) = &result.matched_service {
        output.push_str(&format!(
            "\nService: {} (~{} min)\n",
            service,
            result.estimated_minutes.unwrap_or_default()
        ));
    }

    if !result.items.is_empty() {
        output.push_str("\nItems:\n");
        for item in &result.items {
            output.push_str(&format!(
                "  {:>3}. {:<40} qty {:>8}  value {:>12}\n",
                item.line_no,
                item.description.as_deref().unwrap_or("-"),
                item.quantity.map(|q| q.to_string()).unwrap_or_default(),
                item.value.map(|v| v.to_string()).unwrap_or_default(),
            ));
        }
        if let Some(total) = result.items_total() {
            output.push_str(&format!("  Total: {}\n", total));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_has_header_and_row() {
        let result = ExtractionResult {
            code_no: Some("SD-100".to_string()),
            customer_name: Some("Doe, John".to_string()),
            ..ExtractionResult::default()
        };
        let csv = format_csv(&result).unwrap();
        let mut lines = csv.lines();

        assert!(lines.next().unwrap().starts_with("pi_no,code_no,"));
        let row = lines.next().unwrap();
        assert!(row.contains("SD-100"));
        assert!(row.contains("\"Doe, John\""));
    }

    #[test]
    fn test_text_reports_error() {
        let text = format_text(&ExtractionResult::failure("no text found in document"));
        assert_eq!(text, "Error: no text found in document\n");
    }
}
