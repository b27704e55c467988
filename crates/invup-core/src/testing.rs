//! In-memory fakes for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::backend::{self, ExtractionApi, interpret_response};
use crate::error::StorageError;
use crate::models::file::SelectedFile;
use crate::models::invoice::InvoiceData;
use crate::models::response::ProcessingResponse;
use crate::orchestrator::{Alert, AlertKind, SubmissionView};
use crate::storage::{self, ObjectStore};
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Object store that keeps paths only and serves `https://storage.test/` URLs.
#[derive(Debug, Clone, Default)]
pub struct FakeStore {
    puts: Arc<Mutex<Vec<String>>>,
    deletes: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes fail with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait(?Send)]
impl ObjectStore for FakeStore {
    async fn put(&self, path: &str, _bytes: &[u8], _content_type: &str) -> storage::Result<String> {
        if let Some(message) = &self.failure {
            return Err(StorageError::Sdk(message.clone()));
        }
        self.puts.lock().unwrap().push(path.to_string());
        Ok(format!("https://storage.test/{}", path))
    }

    async fn delete(&self, path: &str) -> storage::Result<()> {
        self.deletes.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

/// Backend that answers every request with a canned status and body.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    status: u16,
    body: String,
    calls: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Gate>>,
}

#[derive(Debug, Default)]
struct Gate {
    called: Notify,
    released: Notify,
}

impl FakeBackend {
    pub fn responding(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    /// Hold every request until [`FakeBackend::release`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Gate::default()));
        self
    }

    /// Wait until a request has reached the backend.
    pub async fn wait_until_called(&self) {
        if let Some(gate) = &self.gate {
            gate.called.notified().await;
        }
    }

    /// Let a held request complete.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.released.notify_one();
        }
    }

    /// Storage URLs received so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait(?Send)]
impl ExtractionApi for FakeBackend {
    async fn extract(
        &self,
        _file: &SelectedFile,
        storage_url: &str,
    ) -> backend::Result<ProcessingResponse> {
        self.calls.lock().unwrap().push(storage_url.to_string());
        if let Some(gate) = &self.gate {
            gate.called.notify_one();
            gate.released.notified().await;
        }
        interpret_response(self.status, &self.body)
    }
}

/// Sink that records every event.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&self, event: TelemetryEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// One call made on a [`RecordingView`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    ShowLoading,
    HideLoading,
    Alert(AlertKind, String),
    ShowResult(InvoiceData),
    HideResult,
}

/// View that records the calls made on it.
#[derive(Debug, Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ViewEvent::Alert(kind, message) => Some(Alert { kind, message }),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl SubmissionView for RecordingView {
    fn show_loading(&self) {
        self.record(ViewEvent::ShowLoading);
    }

    fn hide_loading(&self) {
        self.record(ViewEvent::HideLoading);
    }

    fn alert(&self, alert: &Alert) {
        self.record(ViewEvent::Alert(alert.kind, alert.message.clone()));
    }

    fn show_result(&self, data: &InvoiceData) {
        self.record(ViewEvent::ShowResult(data.clone()));
    }

    fn hide_result(&self) {
        self.record(ViewEvent::HideResult);
    }
}
