//! Rendering of extracted invoice data.

use std::fmt::Write;

use quick_xml::escape::escape;
use rust_decimal::Decimal;

use crate::currency::{LEFT_TO_RIGHT_MARK, RIGHT_TO_LEFT_MARK, format_currency};
use crate::models::invoice::InvoiceData;

/// Heading shown above the result table.
pub const RESULT_HEADING: &str = "Processing Results";

/// Column headers of the line item table.
pub const COLUMNS: [&str; 5] = ["Item Code", "Description", "Quantity", "Price", "Total"];

/// Labels of the footer rows, in order.
pub const FOOTER_LABELS: [&str; 3] = ["Subtotal", "Tax", "Total"];

/// Quantities are shown without trailing zeros.
pub fn format_quantity(quantity: Decimal) -> String {
    quantity.normalize().to_string()
}

fn footer_values(data: &InvoiceData) -> [Decimal; 3] {
    [data.totals.subtotal, data.totals.tax, data.totals.total]
}

/// Render the result table as an HTML fragment.
///
/// Text cells are escaped. Footer labels span the first four columns.
pub fn render_html(data: &InvoiceData) -> String {
    render_html_with(data, format_currency)
}

/// Render the result table as HTML, formatting money with `currency`.
pub fn render_html_with(data: &InvoiceData, currency: impl Fn(Decimal) -> String) -> String {
    let mut html = String::new();

    let _ = writeln!(html, "<h3>{}</h3>", RESULT_HEADING);
    html.push_str("<div class=\"table-responsive\">\n");
    html.push_str("<table class=\"table table-bordered\">\n");

    html.push_str("<thead>\n<tr>");
    for column in COLUMNS {
        let _ = write!(html, "<th>{}</th>", column);
    }
    html.push_str("</tr>\n</thead>\n");

    html.push_str("<tbody>\n");
    for item in &data.line_items {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(item.item_code.as_str()),
            escape(item.description.as_str()),
            format_quantity(item.quantity),
            escape(currency(item.price).as_str()),
            escape(currency(item.total).as_str()),
        );
    }
    html.push_str("</tbody>\n");

    html.push_str("<tfoot>\n");
    for (label, value) in FOOTER_LABELS.iter().zip(footer_values(data)) {
        let _ = writeln!(
            html,
            "<tr><td colspan=\"4\" class=\"text-end\"><strong>{}:</strong></td><td>{}</td></tr>",
            label,
            escape(currency(value).as_str()),
        );
    }
    html.push_str("</tfoot>\n</table>\n</div>\n");

    html
}

/// Render the result table as aligned plain text.
pub fn render_text(data: &InvoiceData) -> String {
    let rows: Vec<[String; 5]> = data
        .line_items
        .iter()
        .map(|item| {
            [
                item.item_code.clone(),
                item.description.clone(),
                format_quantity(item.quantity),
                format_currency(item.price),
                format_currency(item.total),
            ]
        })
        .collect();
    let footer: Vec<(String, String)> = FOOTER_LABELS
        .iter()
        .zip(footer_values(data))
        .map(|(label, value)| (format!("{}:", label), format_currency(value)))
        .collect();

    let mut widths = COLUMNS.map(width);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(width(cell));
        }
    }
    for (_, value) in &footer {
        widths[4] = widths[4].max(width(value));
    }
    // Footer labels are right-aligned across the first four columns.
    let label_width = widths[..4].iter().sum::<usize>() + 3 * 2;

    let mut out = String::new();
    let _ = writeln!(out, "{}", RESULT_HEADING);
    out.push('\n');

    push_row(&mut out, &COLUMNS.map(str::to_string), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    let _ = writeln!(out, "{}", rule.join("  "));

    for (label, value) in &footer {
        let _ = writeln!(
            out,
            "{}  {}",
            pad_left(label, label_width),
            pad_left(value, widths[4])
        );
    }

    out
}

fn width(s: &str) -> usize {
    s.chars().filter(|c| !is_invisible(*c)).count()
}

// Direction marks take no space on screen.
fn is_invisible(c: char) -> bool {
    matches!(c, LEFT_TO_RIGHT_MARK | RIGHT_TO_LEFT_MARK)
}

fn pad_left(s: &str, target: usize) -> String {
    format!("{}{}", " ".repeat(target.saturating_sub(width(s))), s)
}

fn pad_right(s: &str, target: usize) -> String {
    format!("{}{}", s, " ".repeat(target.saturating_sub(width(s))))
}

fn push_row(out: &mut String, row: &[String; 5], widths: &[usize; 5]) {
    let cells: Vec<String> = row
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, w))| {
            // Text columns are left-aligned, figures right-aligned.
            if i < 2 {
                pad_right(cell, *w)
            } else {
                pad_left(cell, *w)
            }
        })
        .collect();
    let _ = writeln!(out, "{}", cells.join("  ").trim_end());
}
