//! The extraction backend: one multipart POST, plus its health probe.

#[cfg(feature = "native")]
mod http;

#[cfg(feature = "native")]
pub use http::{HttpBackend, fetch_firebase_config};

use async_trait::async_trait;

use crate::error::BackendError;
use crate::models::file::SelectedFile;
use crate::models::invoice::InvoiceData;
use crate::models::response::{ProcessingResponse, ResponseEnvelope};

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Multipart field carrying the raw file.
pub const FILE_FIELD: &str = "file";

/// Multipart field carrying the stored blob's URL.
pub const STORAGE_URL_FIELD: &str = "firebase_url";

/// Path of the extraction endpoint, relative to the API base.
pub const UPLOAD_PATH: &str = "/upload";

/// Path of the health endpoint, relative to the API base.
pub const HEALTH_PATH: &str = "/health";

/// Something that turns an invoice image into structured data.
#[async_trait(?Send)]
pub trait ExtractionApi {
    /// Submit the file and the URL it was stored under.
    async fn extract(&self, file: &SelectedFile, storage_url: &str) -> Result<ProcessingResponse>;
}

/// Join the API base and an endpoint path.
pub fn endpoint_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Interpret a raw `/upload` response.
///
/// Any non-2xx status fails before the body is looked at. A 2xx body must be
/// JSON, must report `status: "success"`, and its `invoice_data` must match
/// [`InvoiceData`].
pub fn interpret_response(status: u16, body: &str) -> Result<ProcessingResponse> {
    if !(200..300).contains(&status) {
        return Err(BackendError::HttpStatus(status));
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| BackendError::MalformedJson(e.to_string()))?;

    let envelope: ResponseEnvelope = serde_json::from_value(value)
        .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

    if !envelope.is_success() {
        return Err(BackendError::Rejected(envelope.error_message()));
    }

    let invoice_data = envelope
        .invoice_data
        .ok_or_else(|| BackendError::MalformedResponse("missing invoice_data".to_string()))?;
    let invoice_data: InvoiceData = serde_json::from_value(invoice_data)
        .map_err(|e| BackendError::MalformedResponse(format!("invoice_data: {}", e)))?;

    Ok(ProcessingResponse {
        invoice_data,
        processing_time: envelope.processing_time.and_then(|t| t.as_secs()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn invoice_json() -> serde_json::Value {
        json!({
            "company_details": {"name": "כרמל מעדנים", "address": "תל-אביב", "tax_id": "513203414"},
            "invoice_details": {"invoice_number": "1001", "date": "2024-01-01"},
            "line_items": [
                {"item_code": "A1", "description": "Cheese", "quantity": 2, "price": 10.5, "total": 21}
            ],
            "totals": {"subtotal": 21, "tax": 3.57, "total": 24.57}
        })
    }

    #[test]
    fn test_success_passes_invoice_data_through() {
        let body = json!({
            "status": "success",
            "invoice_data": invoice_json(),
            "processing_time": 1.75
        });

        let response = interpret_response(200, &body.to_string()).unwrap();

        let expected: InvoiceData = serde_json::from_value(invoice_json()).unwrap();
        assert_eq!(response.invoice_data, expected);
        assert_eq!(response.processing_time, Some(1.75));
    }

    #[test]
    fn test_processing_time_as_text() {
        let body = json!({
            "status": "success",
            "invoice_data": invoice_json(),
            "processing_time": "2.50s"
        });
        let response = interpret_response(200, &body.to_string()).unwrap();
        assert_eq!(response.processing_time, Some(2.5));
    }

    #[test]
    fn test_http_error_status() {
        let err = interpret_response(500, r#"{"status":"error","error":"boom"}"#).unwrap_err();
        assert!(matches!(err, BackendError::HttpStatus(500)));
        assert_eq!(err.to_string(), "HTTP error! status: 500");
    }

    #[test]
    fn test_explicit_error_status() {
        let err = interpret_response(200, r#"{"status":"error","error":"bad format"}"#).unwrap_err();
        assert_eq!(err.to_string(), "bad format");
    }

    #[test]
    fn test_error_without_message() {
        let err = interpret_response(200, r#"{"status":"pending"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Processing failed");
    }

    #[test]
    fn test_malformed_json() {
        let err = interpret_response(200, "<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, BackendError::MalformedJson(_)));
    }

    #[test]
    fn test_malformed_invoice_data() {
        let err = interpret_response(200, r#"{"status":"success","invoice_data":{"line_items":"none"}}"#)
            .unwrap_err();
        assert!(matches!(err, BackendError::MalformedResponse(_)));

        let err = interpret_response(200, r#"{"status":"success"}"#).unwrap_err();
        assert!(matches!(err, BackendError::MalformedResponse(_)));
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(endpoint_url("http://localhost:5000/", UPLOAD_PATH), "http://localhost:5000/upload");
        assert_eq!(endpoint_url("http://localhost:5000", HEALTH_PATH), "http://localhost:5000/health");
    }
}
