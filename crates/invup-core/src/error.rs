//! Error types for the invup-core library.

use thiserror::Error;

/// Main error type for the invup library.
#[derive(Error, Debug)]
pub enum InvupError {
    /// The selected file was rejected before any network activity.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Object storage error.
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// Extraction backend error.
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// A submission is already in flight.
    #[error("an invoice is already being processed")]
    Busy,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Client-side checks on the selected file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No file was selected.
    #[error("Please select a file")]
    MissingFile,

    /// The declared MIME type is not an image type.
    #[error("Please upload an image file")]
    UnsupportedType(String),

    /// The file exceeds the size ceiling.
    #[error("File size should be less than {}", size_label(.limit))]
    TooLarge { size: u64, limit: u64 },
}

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

// 6 MiB reads as "6MB"; limits below a kilobyte stay in bytes.
fn size_label(bytes: &u64) -> String {
    let bytes = *bytes;
    let scaled = |unit: u64, suffix: &str| {
        if bytes % unit == 0 {
            format!("{}{}", bytes / unit, suffix)
        } else {
            format!("{:.1}{}", bytes as f64 / unit as f64, suffix)
        }
    };
    if bytes >= MIB {
        scaled(MIB, "MB")
    } else if bytes >= KIB {
        scaled(KIB, "KB")
    } else {
        format!("{} bytes", bytes)
    }
}

/// Errors related to blob storage.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The storage service rejected the request.
    #[error("storage request failed with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The storage service could not be reached.
    #[error("storage transport error: {0}")]
    Transport(String),

    /// The storage service answered with something we cannot use.
    #[error("unexpected storage response: {0}")]
    InvalidResponse(String),

    /// Error raised by the browser storage SDK.
    #[error("{0}")]
    Sdk(String),
}

/// Errors related to the extraction backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Non-2xx HTTP status.
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),

    /// The backend could not be reached.
    #[error("{0}")]
    Transport(String),

    /// The response body is not JSON.
    #[error("malformed JSON response: {0}")]
    MalformedJson(String),

    /// The response is JSON but does not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The backend reported a failure in the response envelope.
    #[error("{0}")]
    Rejected(String),
}

/// Errors related to configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required value is missing.
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    /// A value could not be parsed.
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    /// The remote configuration endpoint failed.
    #[error("failed to load remote config: {0}")]
    Remote(String),
}

/// Result type for the invup library.
pub type Result<T> = std::result::Result<T, InvupError>;
