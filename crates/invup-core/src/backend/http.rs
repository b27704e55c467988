//! HTTP client for the extraction backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use super::{
    endpoint_url, interpret_response, ExtractionApi, Result, FILE_FIELD, HEALTH_PATH,
    STORAGE_URL_FIELD, UPLOAD_PATH,
};
use crate::error::{BackendError, ConfigError};
use crate::models::config::{FirebaseConfig, InvupConfig};
use crate::models::file::SelectedFile;
use crate::models::response::{HealthStatus, ProcessingResponse};

/// Extraction backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend client for `base_url`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Create a backend client from the loaded configuration.
    pub fn from_config(client: reqwest::Client, config: &InvupConfig) -> Self {
        Self::new(client, config.api.effective_base_url())
    }

    /// Build the HTTP client shared by all services.
    pub fn build_client(config: &InvupConfig) -> std::result::Result<reqwest::Client, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build().map_err(|e| ConfigError::Invalid {
            key: "api".to_string(),
            reason: e.to_string(),
        })
    }

    /// The API base this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the backend's health endpoint.
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = endpoint_url(&self.base_url, HEALTH_PATH);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| BackendError::MalformedResponse(e.to_string()))
    }
}

#[async_trait(?Send)]
impl ExtractionApi for HttpBackend {
    async fn extract(&self, file: &SelectedFile, storage_url: &str) -> Result<ProcessingResponse> {
        let url = endpoint_url(&self.base_url, UPLOAD_PATH);

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let form = Form::new()
            .part(FILE_FIELD, part)
            .text(STORAGE_URL_FIELD, storage_url.to_string());

        debug!("POST {} ({} bytes)", url, file.size());
        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let result = interpret_response(status, &body)?;
        info!(
            "Backend extracted {} line items",
            result.invoice_data.line_items.len()
        );
        Ok(result)
    }
}

/// Fetch the Firebase web config served by a deployed frontend.
pub async fn fetch_firebase_config(
    client: &reqwest::Client,
    url: &str,
) -> std::result::Result<FirebaseConfig, ConfigError> {
    debug!("Loading Firebase config from {}", url);
    let response = client
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| ConfigError::Remote(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ConfigError::Remote(format!(
            "{} answered {}",
            url,
            response.status()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| ConfigError::Remote(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn backend(url: &str) -> HttpBackend {
        HttpBackend::new(reqwest::Client::new(), url)
    }

    fn scan() -> SelectedFile {
        SelectedFile::new("scan.png", "image/png", b"fake image bytes".to_vec())
    }

    #[tokio::test]
    async fn test_extract_posts_multipart() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header("accept", "application/json")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file"; filename="scan.png""#.into()),
                Matcher::Regex(r#"name="firebase_url""#.into()),
                Matcher::Regex("https://storage.test/invoices/1_scan.png".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": "success",
                    "invoice_data": {
                        "line_items": [{"item_code": "1", "description": "d", "quantity": 1, "price": 5, "total": 5}],
                        "totals": {"subtotal": 5, "tax": 0.85, "total": 5.85}
                    },
                    "processing_time": "0.42s"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = backend(&server.url())
            .extract(&scan(), "https://storage.test/invoices/1_scan.png")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.invoice_data.line_items.len(), 1);
        assert_eq!(result.processing_time, Some(0.42));
    }

    #[tokio::test]
    async fn test_extract_server_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(500)
            .with_body(r#"{"status":"error","error":"Gemini API is not configured"}"#)
            .create_async()
            .await;

        let err = backend(&server.url())
            .extract(&scan(), "https://storage.test/x")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "HTTP error! status: 500");
    }

    #[tokio::test]
    async fn test_extract_unreachable() {
        let err = backend("http://127.0.0.1:9")
            .extract(&scan(), "https://storage.test/x")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }

    #[tokio::test]
    async fn test_health() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status":"healthy","gemini":"active","timestamp":1700000000.0}"#)
            .create_async()
            .await;

        let health = backend(&server.url()).health().await.unwrap();
        assert!(health.is_healthy());
    }

    #[tokio::test]
    async fn test_fetch_firebase_config() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/firebase-config")
            .with_status(200)
            .with_body(r#"{"apiKey":"k","projectId":"demo","storageBucket":"demo.appspot.com"}"#)
            .create_async()
            .await;

        let url = format!("{}/api/firebase-config", server.url());
        let config = fetch_firebase_config(&reqwest::Client::new(), &url).await.unwrap();
        assert_eq!(config.project_id, "demo");
        assert_eq!(config.storage_bucket, "demo.appspot.com");
    }
}
