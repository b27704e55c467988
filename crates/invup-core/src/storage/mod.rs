//! Remote blob storage for uploaded invoices.

#[cfg(feature = "native")]
mod firebase;

#[cfg(feature = "native")]
pub use firebase::FirebaseStorage;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::file::SelectedFile;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Path written by the connection probe.
pub const PROBE_PATH: &str = "test.txt";

/// An object store that hands out resolvable download URLs.
#[async_trait(?Send)]
pub trait ObjectStore {
    /// Store `bytes` under `path` and return a URL the backend can fetch.
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String>;

    /// Remove the object stored under `path`.
    async fn delete(&self, path: &str) -> Result<()>;
}

#[async_trait(?Send)]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        (**self).put(path, bytes, content_type).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        (**self).delete(path).await
    }
}

/// Where an uploaded invoice ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Resolvable download URL.
    pub url: String,
    /// Blob path inside the bucket.
    pub path: String,
}

/// Build the blob path for a file uploaded at `timestamp_ms`.
///
/// Two uploads of the same name within one millisecond share a path and the
/// later one wins.
pub fn blob_path(prefix: &str, timestamp_ms: i64, file_name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("{}_{}", timestamp_ms, file_name)
    } else {
        format!("{}/{}_{}", prefix, timestamp_ms, file_name)
    }
}

/// Uploads invoices to an [`ObjectStore`] and reports upload telemetry.
pub struct RemoteStorageClient<S> {
    store: S,
    prefix: String,
    telemetry: Arc<dyn TelemetrySink>,
}

impl<S: ObjectStore> RemoteStorageClient<S> {
    /// Create a client storing under the `invoices` prefix.
    pub fn new(store: S, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            store,
            prefix: "invoices".to_string(),
            telemetry,
        }
    }

    /// Set the folder invoices are stored under.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Upload an invoice and return where it was stored.
    ///
    /// Store errors are returned unchanged.
    pub async fn upload_invoice(&self, file: &SelectedFile) -> Result<UploadResult> {
        let started = chrono::Utc::now().timestamp_millis();
        let path = blob_path(&self.prefix, started, &file.name);

        self.telemetry
            .emit(TelemetryEvent::upload_start(file.size(), &file.mime_type));
        debug!("Uploading {} bytes to {}", file.size(), path);

        match self.store.put(&path, &file.bytes, &file.mime_type).await {
            Ok(url) => {
                let elapsed = chrono::Utc::now().timestamp_millis() - started;
                self.telemetry
                    .emit(TelemetryEvent::upload_success(file.size(), elapsed));
                info!("Uploaded invoice to {} in {}ms", path, elapsed);
                Ok(UploadResult { url, path })
            }
            Err(e) => {
                self.telemetry
                    .emit(TelemetryEvent::upload_error(&e.to_string()));
                Err(e)
            }
        }
    }

    /// Delete a previously stored blob.
    pub async fn delete(&self, path: &str) -> Result<()> {
        debug!("Deleting {}", path);
        self.store.delete(path).await
    }

    /// Check that the store accepts writes by storing and removing a small object.
    pub async fn probe(&self) -> Result<()> {
        self.store.put(PROBE_PATH, b"test", "text/plain").await?;
        self.store.delete(PROBE_PATH).await?;
        info!("Storage connection successful");
        Ok(())
    }
}
