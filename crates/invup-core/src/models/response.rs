//! Response envelopes of the extraction backend.

use serde::{Deserialize, Serialize};

use super::invoice::InvoiceData;

/// Literal `status` value of a successful response.
pub const SUCCESS_STATUS: &str = "success";

/// Message used when a failed response carries no `error` field.
pub const GENERIC_FAILURE: &str = "Processing failed";

/// The raw `/upload` response envelope, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    /// `"success"` or an error marker.
    #[serde(default)]
    pub status: Option<String>,

    /// Extracted data, present on success.
    #[serde(default)]
    pub invoice_data: Option<serde_json::Value>,

    /// Server-side processing time.
    #[serde(default)]
    pub processing_time: Option<ProcessingTime>,

    /// Error message, present on failure.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl ResponseEnvelope {
    /// Whether the envelope reports success.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(SUCCESS_STATUS)
    }

    /// The reported error message, or the generic failure message.
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Null) | None => GENERIC_FAILURE.to_string(),
            Some(serde_json::Value::String(_)) => GENERIC_FAILURE.to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// Processing time as reported by the backend: seconds, or text like `"1.23s"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessingTime {
    Seconds(f64),
    Text(String),
}

impl ProcessingTime {
    /// The processing time in seconds, if it can be read.
    pub fn as_secs(&self) -> Option<f64> {
        match self {
            ProcessingTime::Seconds(secs) => Some(*secs),
            ProcessingTime::Text(text) => text
                .trim()
                .trim_end_matches('s')
                .trim()
                .parse::<f64>()
                .ok(),
        }
    }
}

/// A validated, successful extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingResponse {
    /// The extracted invoice, exactly as the backend sent it.
    pub invoice_data: InvoiceData,

    /// Server-reported processing time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
}

/// Response of the backend's `/health` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `"healthy"` when the service is up.
    pub status: String,

    /// State of the extraction model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,

    /// Server time in Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl HealthStatus {
    /// Whether the service reports itself healthy.
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
