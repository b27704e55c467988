//! Batch command - upload and process multiple invoice images.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, warn};

use invup_core::models::invoice::InvoiceData;
use invup_core::models::response::ProcessingResponse;
use invup_core::{Alert, SelectedFile, SubmissionView};

use super::upload::{OutputFormat, format_invoice, report_issues};
use super::{GlobalOpts, Services};

const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching invoice images
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also write summary.csv to the output directory
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Report inconsistent figures in the extracted data
    #[arg(long)]
    validate: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    response: Option<ProcessingResponse>,
    error: Option<String>,
    processing_time_ms: u64,
}

// The overall progress bar stands in for the loading overlay.
struct BatchView<'a> {
    pb: &'a ProgressBar,
}

impl SubmissionView for BatchView<'_> {
    fn show_loading(&self) {}

    fn hide_loading(&self) {}

    fn alert(&self, alert: &Alert) {
        self.pb.println(format!("{} {}", style("✗").red(), alert));
    }

    fn show_result(&self, data: &InvoiceData) {
        self.pb.set_message(format!("{} line items", data.line_items.len()));
    }

    fn hide_result(&self) {}
}

pub async fn run(args: BatchArgs, opts: &GlobalOpts) -> anyhow::Result<ExitCode> {
    let start = Instant::now();

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
        })
        .collect();

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

    let services = Services::connect(opts).await?;

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());
    let outcome = {
        let orchestrator = services.orchestrator()?;
        let view = BatchView { pb: &overall_pb };
        let mut outcome = Ok(());

        // Submissions are strictly sequential; the orchestrator admits one at a time.
        for path in files {
            let file_start = Instant::now();
            let submitted = match SelectedFile::from_path(&path) {
                Ok(file) => orchestrator
                    .submit(Some(&file), &view)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            let processing_time_ms = file_start.elapsed().as_millis() as u64;
            overall_pb.inc(1);

            match submitted {
                Ok(response) => results.push(ProcessResult {
                    path,
                    response: Some(response),
                    error: None,
                    processing_time_ms,
                }),
                Err(error_msg) if args.continue_on_error => {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        response: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                }
                Err(error_msg) => {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    outcome = Err(anyhow::anyhow!("Processing failed: {}", error_msg));
                    break;
                }
            }
        }
        outcome
    };
    overall_pb.finish_with_message("Complete");
    services.finish().await;
    outcome?;

    let successful: Vec<_> = results.iter().filter(|r| r.response.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    for result in &successful {
        let Some(response) = &result.response else {
            continue;
        };
        if args.validate {
            eprintln!("{}", style(result.path.display()).bold());
            report_issues(&response.invoice_data);
        }
        if let Some(output_dir) = &args.output_dir {
            let output_name = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("invoice");
            let output_path =
                output_dir.join(format!("{}.{}", output_name, args.format.extension()));
            fs::write(&output_path, format_invoice(&response.invoice_data, args.format)?)?;
        }
    }

    if args.summary {
        let summary_dir = args.output_dir.as_deref().unwrap_or(Path::new("."));
        let summary_path = summary_dir.join("summary.csv");
        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:.1}s",
        style("✓").green(),
        results.len(),
        start.elapsed().as_secs_f64()
    );
    println!("  Successful: {}", style(successful.len()).green());
    if !failed.is_empty() {
        println!("  Failed: {}", style(failed.len()).red());
        for result in &failed {
            println!(
                "    - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(if failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "line_items",
        "subtotal",
        "tax",
        "total",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(response) = &result.response {
            let totals = &response.invoice_data.totals;
            wtr.write_record([
                filename,
                "success",
                &response.invoice_data.line_items.len().to_string(),
                &totals.subtotal.to_string(),
                &totals.tax.to_string(),
                &totals.total.to_string(),
                &result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
