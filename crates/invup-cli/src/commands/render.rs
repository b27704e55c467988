//! Render command - format a saved backend response without uploading.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use invup_core::interpret_response;
use invup_core::models::invoice::InvoiceData;

use super::upload::{OutputFormat, format_invoice, report_issues, write_output};

/// Arguments for the render command.
#[derive(Args)]
pub struct RenderArgs {
    /// Saved `/upload` response, or bare invoice data, as JSON
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

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let body = fs::read_to_string(&args.input)?;
    let data = parse_saved(&body)?;

    if args.validate {
        report_issues(&data);
    }

    let output = format_invoice(&data, args.format)?;
    write_output(args.output.as_deref(), &output)
}

/// Accept either a full response envelope or the invoice data on its own.
fn parse_saved(body: &str) -> anyhow::Result<InvoiceData> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if value.get("status").is_some() {
        return Ok(interpret_response(200, body)?.invoice_data);
    }

    debug!("No response envelope, reading bare invoice data");
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVOICE: &str = r#"{"line_items":[{"item_code":"1","description":"d","quantity":1,"price":5,"total":5}],"totals":{"subtotal":5,"tax":0.85,"total":5.85}}"#;

    #[test]
    fn test_parse_envelope() {
        let body = format!(r#"{{"status":"success","invoice_data":{},"processing_time":"1.2s"}}"#, INVOICE);
        let data = parse_saved(&body).unwrap();
        assert_eq!(data.line_items.len(), 1);
    }

    #[test]
    fn test_parse_bare_invoice() {
        let data = parse_saved(INVOICE).unwrap();
        assert_eq!(data.line_items[0].item_code, "1");
    }

    #[test]
    fn test_parse_error_envelope() {
        let err = parse_saved(r#"{"status":"error","error":"bad format"}"#).unwrap_err();
        assert_eq!(err.to_string(), "bad format");
    }
}
