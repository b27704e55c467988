//! Best-effort analytics events.
//!
//! Emitting an event never blocks and never fails from the caller's point of
//! view. Sinks that deliver over the network log delivery problems and drop
//! the event.

#[cfg(feature = "native")]
mod measurement;

#[cfg(feature = "native")]
pub use measurement::MeasurementProtocolSink;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

/// Generic user interaction event.
pub const USER_INTERACTION: &str = "user_interaction";
/// Storage upload started.
pub const UPLOAD_START: &str = "invoice_upload_start";
/// Storage upload finished.
pub const UPLOAD_SUCCESS: &str = "invoice_upload_success";
/// Storage upload failed.
pub const UPLOAD_ERROR: &str = "invoice_upload_error";
/// Backend extraction finished.
pub const PROCESSING_SUCCESS: &str = "invoice_processing_success";
/// Upload or extraction failed.
pub const PROCESSING_ERROR: &str = "invoice_processing_error";

/// A scalar event property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for TelemetryValue {
    fn from(value: &str) -> Self {
        TelemetryValue::Text(value.to_string())
    }
}

impl From<String> for TelemetryValue {
    fn from(value: String) -> Self {
        TelemetryValue::Text(value)
    }
}

impl From<i64> for TelemetryValue {
    fn from(value: i64) -> Self {
        TelemetryValue::Integer(value)
    }
}

impl From<u64> for TelemetryValue {
    fn from(value: u64) -> Self {
        TelemetryValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for TelemetryValue {
    fn from(value: f64) -> Self {
        TelemetryValue::Float(value)
    }
}

impl From<bool> for TelemetryValue {
    fn from(value: bool) -> Self {
        TelemetryValue::Bool(value)
    }
}

/// Flat property map of an event.
pub type Properties = BTreeMap<String, TelemetryValue>;

/// A named analytics event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub name: String,
    pub properties: Properties,
}

impl TelemetryEvent {
    /// Create an event without properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Properties::new(),
        }
    }

    /// Add a property.
    pub fn with(mut self, key: &str, value: impl Into<TelemetryValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Add a `timestamp` property with the current time in Unix milliseconds.
    pub fn timestamped(self) -> Self {
        self.with("timestamp", chrono::Utc::now().timestamp_millis())
    }

    /// Look up a property.
    pub fn get(&self, key: &str) -> Option<&TelemetryValue> {
        self.properties.get(key)
    }

    /// A generic user interaction.
    pub fn interaction(action: &str) -> Self {
        Self::new(USER_INTERACTION).with("action", action).timestamped()
    }

    pub fn upload_start(file_size: u64, file_type: &str) -> Self {
        Self::new(UPLOAD_START)
            .with("fileSize", file_size)
            .with("fileType", file_type)
    }

    pub fn upload_success(file_size: u64, upload_time_ms: i64) -> Self {
        Self::new(UPLOAD_SUCCESS)
            .with("fileSize", file_size)
            .with("uploadTime", upload_time_ms)
    }

    pub fn upload_error(message: &str) -> Self {
        Self::new(UPLOAD_ERROR).with("error", message)
    }

    /// Extraction succeeded after `processing_time` seconds on the server.
    pub fn processing_success(processing_time: f64) -> Self {
        Self::new(PROCESSING_SUCCESS)
            .with("processingTime", processing_time)
            .timestamped()
    }

    /// Upload or extraction failed. The processing time is always zero.
    pub fn processing_error(message: &str) -> Self {
        Self::new(PROCESSING_ERROR)
            .with("processingTime", 0.0)
            .with("error", message)
            .timestamped()
    }
}

/// Destination for analytics events.
pub trait TelemetrySink {
    /// Queue an event. Must not block and must not panic.
    fn emit(&self, event: TelemetryEvent);

    /// Attach properties to the current user for subsequent events.
    fn set_user_properties(&self, properties: Properties) {
        let _ = properties;
    }
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Arc<T> {
    fn emit(&self, event: TelemetryEvent) {
        (**self).emit(event)
    }

    fn set_user_properties(&self, properties: Properties) {
        (**self).set_user_properties(properties)
    }
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn emit(&self, event: TelemetryEvent) {
        tracing::trace!(event = %event.name, "telemetry disabled, dropping event");
    }
}
