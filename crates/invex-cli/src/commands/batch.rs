//! Batch command - extract fields from many documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use invex_core::{parse_invoice_date, ExtractionResult, InvoiceEngine, InvoiceExtractor};

use crate::decode;

use super::extract::{format_result, OutputFormat};
use super::{build_engine, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Exit successfully even when some documents fail
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    record: ExtractionResult,
    processing_time_ms: u64,
}

impl ProcessResult {
    fn error(&self) -> Option<&str> {
        self.record.error.as_deref()
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    // Expand glob pattern
    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = decode::extension_of(p);
            decode::SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let multi_progress = MultiProgress::new();
    let overall_pb = multi_progress.add(ProgressBar::new(files.len() as u64));
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let engine = Arc::new(build_engine(config));
    let mut results = process_files(engine, files, args.jobs, &overall_pb).await?;
    results.sort_by(|a, b| a.path.cmp(&b.path));

    overall_pb.finish_with_message("Complete");

    let (failed, successful): (Vec<&ProcessResult>, Vec<&ProcessResult>) =
        results.iter().partition(|r| r.error().is_some());

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            let output_path = output_path_for(output_dir, &result.path, args.format);
            fs::write(&output_path, format_result(&result.record, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error().unwrap_or("unknown error")
            );
        }

        if !args.continue_on_error {
            anyhow::bail!("{} of {} files failed", failed.len(), results.len());
        }
    }

    Ok(())
}

/// Run every file through the engine on blocking workers, at most `jobs` at
/// a time.
async fn process_files(
    engine: Arc<InvoiceEngine>,
    files: Vec<PathBuf>,
    jobs: usize,
    pb: &ProgressBar,
) -> anyhow::Result<Vec<ProcessResult>> {
    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();

    for path in files {
        let engine = Arc::clone(&engine);
        let pb = pb.clone();
        let permit = Arc::clone(&permits).acquire_owned().await?;

        tasks.spawn_blocking(move || {
            let _permit = permit;
            let result = process_single_file(&engine, path);
            pb.inc(1);
            result
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let result = joined?;
        if let Some(error) = result.error() {
            warn!("Failed to process {}: {}", result.path.display(), error);
        }
        results.push(result);
    }

    Ok(results)
}

fn process_single_file(engine: &InvoiceEngine, path: PathBuf) -> ProcessResult {
    let file_start = Instant::now();

    let document = decode::decode_file(&path);
    let record = engine.extract_document(&document);
    if record.is_error() && document.success {
        error!("Extraction failed for {}", path.display());
    }

    ProcessResult {
        path,
        record,
        processing_time_ms: file_start.elapsed().as_millis() as u64,
    }
}

/// Output file for one input. The whole input file name is kept so that
/// `a.txt` and `a.pdf` never write to the same place.
fn output_path_for(output_dir: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    let output_name = input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice");

    let extension = match format {
        OutputFormat::Json => "json",
        OutputFormat::Csv => "csv",
        OutputFormat::Text => "txt",
    };

    output_dir.join(format!("{}.{}", output_name, extension))
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "pi_no",
        "code_no",
        "invoice_date",
        "customer_name",
        "plate_number",
        "amount",
        "matched_service",
        "items",
        "items_total",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let record = &result.record;
        let invoice_date = record
            .invoice_date
            .as_deref()
            .map(|raw| {
                parse_invoice_date(raw)
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| raw.to_string())
            })
            .unwrap_or_default();

        wtr.write_record([
            filename,
            if record.is_error() { "error" } else { "success" },
            record.pi_no.as_deref().unwrap_or(""),
            record.code_no.as_deref().unwrap_or(""),
            &invoice_date,
            record.customer_name.as_deref().unwrap_or(""),
            record.plate_number.as_deref().unwrap_or(""),
            record.amount.as_deref().unwrap_or(""),
            record.matched_service.as_deref().unwrap_or(""),
            &record.items.len().to_string(),
            &record
                .items_total()
                .map(|t| t.to_string())
                .unwrap_or_default(),
            &result.processing_time_ms.to_string(),
            record.error.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_uses_format_extension() {
        let path = output_path_for(Path::new("out"), Path::new("in/inv-7.pdf"), OutputFormat::Text);
        assert_eq!(path, PathBuf::from("out/inv-7.pdf.txt"));
    }

    #[test]
    fn test_same_stem_inputs_get_distinct_outputs() {
        let out = Path::new("out");
        let from_text = output_path_for(out, Path::new("in/a.txt"), OutputFormat::Json);
        let from_pdf = output_path_for(out, Path::new("in/a.pdf"), OutputFormat::Json);

        assert_eq!(from_text, PathBuf::from("out/a.txt.json"));
        assert_eq!(from_pdf, PathBuf::from("out/a.pdf.json"));
    }
}
