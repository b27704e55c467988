//! The upload → extract → render workflow.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use crate::backend::ExtractionApi;
use crate::error::{ConfigError, InvupError, Result, ValidationError};
use crate::models::config::InvupConfig;
use crate::models::file::SelectedFile;
use crate::models::invoice::InvoiceData;
use crate::models::response::ProcessingResponse;
use crate::storage::{ObjectStore, RemoteStorageClient, UploadResult};
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use crate::validation::FileValidator;

/// Prefix of alerts shown for failed submissions.
pub const FAILURE_PREFIX: &str = "Error processing invoice";

/// What the user sees while a submission runs.
pub trait SubmissionView {
    /// Show the blocking loading indicator.
    fn show_loading(&self);

    /// Hide the loading indicator.
    fn hide_loading(&self);

    /// Show a blocking notification.
    fn alert(&self, alert: &Alert);

    /// Display the extracted invoice.
    fn show_result(&self, data: &InvoiceData);

    /// Hide any previously displayed result.
    fn hide_result(&self);
}

/// Kind of user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// The file was rejected before any network activity.
    Validation,
    /// Another submission is still running.
    Busy,
    /// Upload or extraction failed.
    Failure,
}

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    /// The underlying error message.
    pub message: String,
}

impl Alert {
    fn validation(error: &ValidationError) -> Self {
        Self {
            kind: AlertKind::Validation,
            message: error.to_string(),
        }
    }

    fn busy() -> Self {
        Self {
            kind: AlertKind::Busy,
            message: InvupError::Busy.to_string(),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            kind: AlertKind::Failure,
            message,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AlertKind::Failure => write!(f, "{}: {}", FAILURE_PREFIX, self.message),
            AlertKind::Validation | AlertKind::Busy => f.write_str(&self.message),
        }
    }
}

// Clears the busy flag when the submission ends, whichever way it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// Hides the loading indicator exactly once.
struct LoadingGuard<'a, V: SubmissionView + ?Sized>(&'a V);

impl<'a, V: SubmissionView + ?Sized> LoadingGuard<'a, V> {
    fn show(view: &'a V) -> Self {
        view.show_loading();
        Self(view)
    }
}

impl<V: SubmissionView + ?Sized> Drop for LoadingGuard<'_, V> {
    fn drop(&mut self) {
        self.0.hide_loading();
    }
}

/// Drives one submission at a time through validation, storage, extraction
/// and rendering.
pub struct UploadOrchestrator<S, B> {
    validator: FileValidator,
    storage: RemoteStorageClient<S>,
    backend: B,
    telemetry: Arc<dyn TelemetrySink>,
    delete_on_failure: bool,
    busy: AtomicBool,
}

impl<S: ObjectStore, B: ExtractionApi> UploadOrchestrator<S, B> {
    /// Create an orchestrator with the default file checks.
    pub fn new(store: S, backend: B, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            validator: FileValidator::default(),
            storage: RemoteStorageClient::new(store, telemetry.clone()),
            backend,
            telemetry,
            delete_on_failure: false,
            busy: AtomicBool::new(false),
        }
    }

    /// Create an orchestrator configured from `config`.
    pub fn from_config(
        config: &InvupConfig,
        store: S,
        backend: B,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(store, backend, telemetry)
            .with_validator(FileValidator::from_config(&config.upload)?)
            .with_storage_prefix(config.storage.prefix.clone())
            .with_delete_on_failure(config.upload.delete_on_failure))
    }

    /// Replace the file checks.
    pub fn with_validator(mut self, validator: FileValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Set the folder invoices are stored under.
    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage = self.storage.with_prefix(prefix);
        self
    }

    /// Delete the stored blob when extraction fails.
    pub fn with_delete_on_failure(mut self, delete: bool) -> Self {
        self.delete_on_failure = delete;
        self
    }

    /// The storage client, for probes and maintenance.
    pub fn storage(&self) -> &RemoteStorageClient<S> {
        &self.storage
    }

    /// Whether a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Turn a selection away from its declared type and size alone.
    ///
    /// Front ends that have to load the file first call this before reading
    /// it. Rejections are alerted like in [`submit`](Self::submit), which
    /// checks the loaded file again.
    pub fn screen<V>(&self, declared: Option<(&str, u64)>, view: &V) -> Result<()>
    where
        V: SubmissionView + ?Sized,
    {
        if self.is_busy() {
            warn!("Selection rejected: a submission is in flight");
            view.alert(&Alert::busy());
            return Err(InvupError::Busy);
        }

        let checked = match declared {
            Some((mime_type, size)) => self.validator.check(mime_type, size),
            None => Err(ValidationError::MissingFile),
        };
        if let Err(e) = checked {
            debug!("Validation failed: {}", e);
            view.alert(&Alert::validation(&e));
            return Err(e.into());
        }
        Ok(())
    }

    /// Run one submission.
    ///
    /// The view receives exactly one outcome: a rendered result or an alert.
    /// The loading indicator is shown only once validation has passed and is
    /// hidden exactly once before this returns.
    pub async fn submit<V>(&self, file: Option<&SelectedFile>, view: &V) -> Result<ProcessingResponse>
    where
        V: SubmissionView + ?Sized,
    {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            warn!("Submission rejected: another one is in flight");
            view.alert(&Alert::busy());
            return Err(InvupError::Busy);
        };

        let file = match self.validator.validate(file) {
            Ok(file) => file,
            Err(e) => {
                debug!("Validation failed: {}", e);
                view.alert(&Alert::validation(&e));
                return Err(e.into());
            }
        };

        let _loading = LoadingGuard::show(view);

        self.telemetry.emit(
            TelemetryEvent::interaction("upload_start")
                .with("fileSize", file.size())
                .with("fileType", file.mime_type.as_str()),
        );

        let mut stored = None;
        match self.process(file, &mut stored).await {
            Ok(response) => {
                self.telemetry.emit(TelemetryEvent::processing_success(
                    response.processing_time.unwrap_or(0.0),
                ));
                info!(
                    "Processed {} with {} line items",
                    file.name,
                    response.invoice_data.line_items.len()
                );
                view.show_result(&response.invoice_data);
                Ok(response)
            }
            Err(e) => {
                let message = e.to_string();
                error!("Error processing {}: {}", file.name, message);
                self.telemetry
                    .emit(TelemetryEvent::processing_error(&message));

                if let Some(upload) = stored.filter(|_| self.delete_on_failure) {
                    self.cleanup(&upload).await;
                }

                view.alert(&Alert::failure(message));
                view.hide_result();
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        file: &SelectedFile,
        stored: &mut Option<UploadResult>,
    ) -> Result<ProcessingResponse> {
        let upload = self.storage.upload_invoice(file).await?;
        let url = upload.url.clone();
        *stored = Some(upload);

        Ok(self.backend.extract(file, &url).await?)
    }

    async fn cleanup(&self, upload: &UploadResult) {
        match self.storage.delete(&upload.path).await {
            Ok(()) => info!("Deleted orphaned upload {}", upload.path),
            Err(e) => warn!("Failed to delete orphaned upload {}: {}", upload.path, e),
        }
    }
}
