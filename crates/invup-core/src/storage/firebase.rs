//! Firebase Storage over its REST API.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use super::{ObjectStore, Result};
use crate::error::StorageError;
use crate::models::config::InvupConfig;

/// A Firebase Storage bucket accessed through `firebasestorage.googleapis.com`.
#[derive(Debug, Clone)]
pub struct FirebaseStorage {
    client: reqwest::Client,
    endpoint: Url,
    bucket: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

impl FirebaseStorage {
    /// Create a storage client for `bucket` behind `endpoint`.
    pub fn new(client: reqwest::Client, endpoint: &str, bucket: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StorageError::Transport(format!("invalid storage endpoint: {}", e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(StorageError::Transport(format!(
                "invalid storage endpoint: {}",
                endpoint
            )));
        }

        Ok(Self {
            client,
            endpoint,
            bucket: bucket.to_string(),
        })
    }

    /// Create a storage client from the loaded configuration.
    pub fn from_config(client: reqwest::Client, config: &InvupConfig) -> Result<Self> {
        Self::new(client, &config.storage.endpoint, &config.firebase.storage_bucket)
    }

    // {endpoint}/v0/b/{bucket}/o[/{object}], with the object name as one
    // encoded segment.
    fn object_url(&self, object: Option<&str>) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["v0", "b", self.bucket.as_str(), "o"]);
            if let Some(name) = object {
                segments.push(name);
            }
        }
        url
    }

    fn download_url(&self, name: &str, token: Option<&str>) -> String {
        let mut url = self.object_url(Some(name));
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("alt", "media");
            if let Some(token) = token {
                query.append_pair("token", token);
            }
        }
        url.to_string()
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StorageError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait(?Send)]
impl ObjectStore for FirebaseStorage {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let mut url = self.object_url(None);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", path);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        let response = Self::check(response).await?;

        let metadata: ObjectMetadata = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        // Several tokens may be issued; any of them grants read access.
        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|t| !t.is_empty());

        debug!("Stored object {}", metadata.name);
        Ok(self.download_url(&metadata.name, token))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.object_url(Some(path)))
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }
}
