//! Upload command - send one invoice through storage and extraction.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use invup_core::models::invoice::InvoiceData;
use invup_core::{
    Alert, AlertKind, FileValidator, SelectedFile, SubmissionView, render_html, render_text,
};

use super::{GlobalOpts, Services, load_config};

/// Arguments for the upload command.
#[derive(Args)]
pub struct UploadArgs {
    /// Invoice image
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Report inconsistent figures in the extracted data
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned table
    Text,
    /// HTML fragment
    Html,
    /// CSV, one row per line item
    Csv,
    /// The extracted invoice data as JSON
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Html => "html",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Terminal rendition of the submission view: a spinner for the loading
/// overlay and styled messages on stderr for alerts.
pub struct TerminalView {
    spinner: ProgressBar,
}

impl TerminalView {
    pub fn new(message: String) -> Self {
        let spinner = ProgressBar::hidden();
        spinner.set_message(message);
        Self { spinner }
    }
}

impl SubmissionView for TerminalView {
    fn show_loading(&self) {
        self.spinner.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        self.spinner.enable_steady_tick(Duration::from_millis(100));
    }

    fn hide_loading(&self) {
        self.spinner.finish_and_clear();
    }

    fn alert(&self, alert: &Alert) {
        let marker = match alert.kind {
            AlertKind::Failure => style("✗").red(),
            AlertKind::Validation | AlertKind::Busy => style("!").yellow(),
        };
        self.spinner.suspend(|| eprintln!("{} {}", marker, alert));
    }

    fn show_result(&self, data: &InvoiceData) {
        self.spinner.suspend(|| {
            eprintln!(
                "{} Extracted {} line items",
                style("✓").green(),
                data.line_items.len()
            )
        });
    }

    // Nothing from an earlier run stays on screen.
    fn hide_result(&self) {}
}

pub async fn run(args: UploadArgs, opts: &GlobalOpts) -> anyhow::Result<ExitCode> {
    let start = Instant::now();

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let file = SelectedFile::from_path(&args.input)?;
    debug!("Selected {} ({}, {} bytes)", file.name, file.mime_type, file.size());

    let config = load_config(opts)?;
    let view = TerminalView::new(format!("Processing {}...", file.name));

    // Nothing goes over the network for a file that would be rejected.
    let validator = FileValidator::from_config(&config.upload)?;
    if let Err(e) = validator.check(&file.mime_type, file.size()) {
        view.alert(&Alert {
            kind: AlertKind::Validation,
            message: e.to_string(),
        });
        return Ok(ExitCode::FAILURE);
    }

    let services = Services::start(config).await?;
    let result = {
        let orchestrator = services.orchestrator()?;
        orchestrator.submit(Some(&file), &view).await
    };
    services.finish().await;

    // The view has already reported the failure.
    let Ok(response) = result else {
        return Ok(ExitCode::FAILURE);
    };

    if args.validate {
        report_issues(&response.invoice_data);
    }

    let output = format_invoice(&response.invoice_data, args.format)?;
    write_output(args.output.as_deref(), &output)?;

    if let Some(secs) = response.processing_time {
        eprintln!("{} Processing time: {:.2}s", style("ℹ").blue(), secs);
    }
    debug!("Total time: {:?}", start.elapsed());

    Ok(ExitCode::SUCCESS)
}

/// Print consistency issues found in the extracted figures.
pub fn report_issues(data: &InvoiceData) {
    let issues = data.validate();
    if !issues.is_empty() {
        eprintln!("{}", style("Validation issues:").yellow());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
    }
}

pub fn format_invoice(data: &InvoiceData, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(data)),
        OutputFormat::Html => Ok(render_html(data)),
        OutputFormat::Csv => format_csv(data),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
    }
}

fn format_csv(data: &InvoiceData) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["item_code", "description", "quantity", "price", "total"])?;

    for item in &data.line_items {
        wtr.write_record([
            item.item_code.as_str(),
            item.description.as_str(),
            &item.quantity.normalize().to_string(),
            &item.price.to_string(),
            &item.total.to_string(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

/// Write to `path`, or stdout when none is given.
pub fn write_output(path: Option<&Path>, output: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, output)?;
            eprintln!("{} Output written to {}", style("✓").green(), path.display());
        }
        None => print!("{}", output),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> InvoiceData {
        serde_json::from_value(json!({
            "line_items": [
                {"item_code": "A1", "description": "Cheese, aged", "quantity": 2.0, "price": 10.5, "total": 21}
            ],
            "totals": {"subtotal": 21, "tax": 3.57, "total": 24.57}
        }))
        .unwrap()
    }

    #[test]
    fn test_csv_one_row_per_item() {
        let csv = format_invoice(&sample(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "item_code,description,quantity,price,total");
        assert_eq!(lines[1], "A1,\"Cheese, aged\",2,10.5,21");
    }

    #[test]
    fn test_json_is_invoice_data() {
        let out = format_invoice(&sample(), OutputFormat::Json).unwrap();
        let back: InvoiceData = serde_json::from_str(&out).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_html_and_text() {
        assert!(format_invoice(&sample(), OutputFormat::Html).unwrap().contains("<table"));
        assert!(format_invoice(&sample(), OutputFormat::Text).unwrap().contains("Cheese, aged"));
    }
}
