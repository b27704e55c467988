//! Invoice data as returned by the extraction backend.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Structured invoice data extracted by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    /// Seller details, when the backend found them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_details: Option<CompanyDetails>,

    /// Invoice number and date, when the backend found them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_details: Option<InvoiceDetails>,

    /// Line items in document order.
    pub line_items: Vec<LineItem>,

    /// Invoice totals.
    pub totals: Totals,
}

/// Seller details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyDetails {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub address: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub tax_id: String,
}

/// Invoice identification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetails {
    #[serde(default, deserialize_with = "lenient_text")]
    pub invoice_number: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
}

/// A single row of the invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product code as printed on the invoice.
    #[serde(default, deserialize_with = "lenient_text")]
    pub item_code: String,

    /// Product or service description.
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,

    /// Quantity.
    #[serde(serialize_with = "serialize_amount")]
    pub quantity: Decimal,

    /// Unit price.
    #[serde(serialize_with = "serialize_amount")]
    pub price: Decimal,

    /// Line total.
    #[serde(serialize_with = "serialize_amount")]
    pub total: Decimal,
}

/// Invoice totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    #[serde(serialize_with = "serialize_amount")]
    pub subtotal: Decimal,

    #[serde(serialize_with = "serialize_amount")]
    pub tax: Decimal,

    #[serde(serialize_with = "serialize_amount")]
    pub total: Decimal,
}

impl InvoiceData {
    /// Sum of all line totals.
    pub fn line_total_sum(&self) -> Decimal {
        self.line_items.iter().map(|item| item.total).sum()
    }

    /// Check the figures for internal consistency and return any issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let tolerance = Decimal::new(1, 2);

        if self.line_items.is_empty() {
            issues.push("No line items".to_string());
        }

        for (idx, item) in self.line_items.iter().enumerate() {
            let expected = (item.quantity * item.price).round_dp(2);
            if (expected - item.total).abs() > tolerance {
                issues.push(format!(
                    "Line {} total ({}) differs from quantity x price ({})",
                    idx + 1,
                    item.total,
                    expected
                ));
            }
        }

        let sum = self.line_total_sum();
        if (sum - self.totals.subtotal).abs() > tolerance {
            issues.push(format!(
                "Line item total ({}) differs from subtotal ({})",
                sum, self.totals.subtotal
            ));
        }

        if (self.totals.subtotal + self.totals.tax - self.totals.total).abs() > tolerance {
            issues.push(format!(
                "Subtotal plus tax ({}) differs from total ({})",
                self.totals.subtotal + self.totals.tax,
                self.totals.total
            ));
        }

        issues
    }
}

// Amounts go out as JSON numbers; rust_decimal's default is a string.
fn serialize_amount<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    match value.to_f64() {
        Some(v) => serializer.serialize_f64(v),
        None => serializer.serialize_str(&value.to_string()),
    }
}

// The backend stringifies most text fields but occasionally sends numbers
// (item codes) or nulls.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
