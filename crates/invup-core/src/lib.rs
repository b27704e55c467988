//! Core library for the invoice upload client.
//!
//! This crate provides:
//! - Client-side validation of the selected invoice image
//! - Blob storage with resolvable download URLs (Firebase Storage)
//! - The extraction backend client and response validation
//! - Best-effort analytics events
//! - The submission workflow tying these together
//! - Result rendering with he-IL / ILS currency formatting

pub mod backend;
pub mod currency;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod render;
pub mod storage;
pub mod telemetry;
pub mod validation;

#[cfg(test)]
mod testing;

pub use models::config;

pub use backend::{ExtractionApi, interpret_response};
pub use currency::{format_currency, format_currency_f64};
pub use error::{BackendError, ConfigError, InvupError, Result, StorageError, ValidationError};
pub use models::config::InvupConfig;
pub use models::file::SelectedFile;
pub use models::invoice::{InvoiceData, LineItem, Totals};
pub use models::response::{HealthStatus, ProcessingResponse};
pub use orchestrator::{Alert, AlertKind, SubmissionView, UploadOrchestrator};
pub use render::{render_html, render_html_with, render_text};
pub use storage::{ObjectStore, RemoteStorageClient, UploadResult};
pub use telemetry::{NoopSink, TelemetryEvent, TelemetrySink};
pub use validation::FileValidator;

#[cfg(feature = "native")]
pub use backend::{HttpBackend, fetch_firebase_config};
#[cfg(feature = "native")]
pub use storage::FirebaseStorage;
#[cfg(feature = "native")]
pub use telemetry::MeasurementProtocolSink;
