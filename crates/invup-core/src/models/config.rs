//! Configuration for the upload client.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Extraction backend used for local development.
pub const LOCAL_API_URL: &str = "http://localhost:5000";

/// Deployed extraction backend.
pub const DEPLOYED_API_URL: &str = "https://gemini-invoice-processor.onrender.com";

/// Default upload ceiling: 6 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 6 * 1024 * 1024;

/// Default accepted MIME type pattern.
pub const DEFAULT_ACCEPTED_TYPES: &str = "image.*";

/// Main configuration for the upload client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvupConfig {
    /// Extraction backend configuration.
    pub api: ApiConfig,

    /// Client-side upload checks.
    pub upload: UploadConfig,

    /// Object storage configuration.
    pub storage: StorageConfig,

    /// Firebase project configuration.
    pub firebase: FirebaseConfig,

    /// Analytics configuration.
    pub telemetry: TelemetryConfig,
}

/// Extraction backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Explicit backend URL. Overrides `local`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Talk to the local development backend.
    pub local: bool,

    /// Request timeout in seconds. Unset leaves timeouts to the transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Endpoint serving the Firebase config in deployed environments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase_config_url: Option<String>,
}

impl ApiConfig {
    /// The backend URL in effect.
    pub fn effective_base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url.as_str(),
            None if self.local => LOCAL_API_URL,
            None => DEPLOYED_API_URL,
        }
    }
}

/// Client-side upload checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted file in bytes.
    pub max_file_size: u64,

    /// Regex the declared MIME type must match.
    pub accepted_types: String,

    /// Delete the stored blob when processing fails.
    pub delete_on_failure: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            accepted_types: DEFAULT_ACCEPTED_TYPES.to_string(),
            delete_on_failure: false,
        }
    }
}

/// Object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Firebase Storage REST endpoint.
    pub endpoint: String,

    /// Folder under which invoices are stored.
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://firebasestorage.googleapis.com".to_string(),
            prefix: "invoices".to_string(),
        }
    }
}

/// Firebase web app configuration, in Firebase's own field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub measurement_id: String,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            auth_domain: "invoice-processor-app.firebaseapp.com".to_string(),
            project_id: "invoice-processor-app".to_string(),
            storage_bucket: "invoice-processor-app.appspot.com".to_string(),
            messaging_sender_id: String::new(),
            app_id: String::new(),
            measurement_id: String::new(),
        }
    }
}

/// Analytics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Send analytics events.
    pub enabled: bool,

    /// Measurement Protocol collection endpoint.
    pub endpoint: String,

    /// Measurement Protocol API secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://www.google-analytics.com/mp/collect".to_string(),
            api_secret: None,
        }
    }
}

impl InvupConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Overlay values from environment variables.
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let firebase = &mut self.firebase;
        let string_fields: [(&str, &mut String); 7] = [
            ("FIREBASE_API_KEY", &mut firebase.api_key),
            ("FIREBASE_AUTH_DOMAIN", &mut firebase.auth_domain),
            ("FIREBASE_PROJECT_ID", &mut firebase.project_id),
            ("FIREBASE_STORAGE_BUCKET", &mut firebase.storage_bucket),
            ("FIREBASE_SENDER_ID", &mut firebase.messaging_sender_id),
            ("FIREBASE_APP_ID", &mut firebase.app_id),
            ("FIREBASE_MEASUREMENT_ID", &mut firebase.measurement_id),
        ];
        for (key, field) in string_fields {
            if let Some(value) = get(key) {
                *field = value;
            }
        }

        if let Some(url) = get("INVUP_API_BASE") {
            self.api.base_url = Some(url);
        }
        if let Some(url) = get("INVUP_FIREBASE_CONFIG_URL") {
            self.api.firebase_config_url = Some(url);
        }
        if let Some(secret) = get("INVUP_ANALYTICS_SECRET") {
            self.telemetry.api_secret = Some(secret);
        }
        if let Some(value) = get("INVUP_MAX_FILE_SIZE") {
            self.upload.max_file_size = value.parse().map_err(|_| ConfigError::Invalid {
                key: "INVUP_MAX_FILE_SIZE".to_string(),
                reason: format!("expected a byte count, got {:?}", value),
            })?;
        }

        Ok(())
    }

    /// Whether the Firebase config should be fetched from the remote endpoint.
    pub fn wants_remote_firebase_config(&self) -> bool {
        !self.api.local && self.api.firebase_config_url.is_some()
    }

    /// Check that the values needed for an upload are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.firebase.storage_bucket.trim().is_empty() {
            return Err(ConfigError::Missing("firebase.storageBucket"));
        }
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::Invalid {
                key: "upload.max_file_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Measurement id and API secret, when analytics can be sent.
    pub fn analytics_credentials(&self) -> Option<(&str, &str)> {
        if !self.telemetry.enabled || self.firebase.measurement_id.is_empty() {
            return None;
        }
        self.telemetry
            .api_secret
            .as_deref()
            .map(|secret| (self.firebase.measurement_id.as_str(), secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = InvupConfig::default();
        assert_eq!(config.upload.max_file_size, 6 * 1024 * 1024);
        assert_eq!(config.storage.prefix, "invoices");
        assert_eq!(config.api.effective_base_url(), DEPLOYED_API_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_base_url() {
        let mut config = InvupConfig::default();
        config.api.local = true;
        assert_eq!(config.api.effective_base_url(), LOCAL_API_URL);

        config.api.base_url = Some("http://backend:8080".to_string());
        assert_eq!(config.api.effective_base_url(), "http://backend:8080");
    }

    #[test]
    fn test_apply_env() {
        let mut config = InvupConfig::default();
        config
            .apply_env(env(&[
                ("FIREBASE_API_KEY", "key-123"),
                ("FIREBASE_STORAGE_BUCKET", "bucket.appspot.com"),
                ("FIREBASE_APP_ID", ""),
                ("INVUP_API_BASE", "http://127.0.0.1:5000"),
            ]))
            .unwrap();

        assert_eq!(config.firebase.api_key, "key-123");
        assert_eq!(config.firebase.storage_bucket, "bucket.appspot.com");
        assert_eq!(config.firebase.project_id, "invoice-processor-app");
        assert_eq!(config.firebase.app_id, "");
        assert_eq!(config.api.effective_base_url(), "http://127.0.0.1:5000");
    }

    #[test]
    fn test_apply_env_invalid_size() {
        let mut config = InvupConfig::default();
        let result = config.apply_env(env(&[("INVUP_MAX_FILE_SIZE", "big")]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_firebase_config_uses_camel_case() {
        let config: FirebaseConfig = serde_json::from_str(
            r#"{"apiKey":"k","projectId":"p","storageBucket":"b","messagingSenderId":"1"}"#,
        )
        .unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.storage_bucket, "b");
        assert_eq!(config.messaging_sender_id, "1");
        assert_eq!(config.auth_domain, "invoice-processor-app.firebaseapp.com");
    }

    #[test]
    fn test_analytics_credentials() {
        let mut config = InvupConfig::default();
        assert!(config.analytics_credentials().is_none());

        config.firebase.measurement_id = "G-TEST".to_string();
        config.telemetry.api_secret = Some("secret".to_string());
        assert_eq!(config.analytics_credentials(), Some(("G-TEST", "secret")));

        config.telemetry.enabled = false;
        assert!(config.analytics_credentials().is_none());
    }

    #[test]
    fn test_validate_missing_bucket() {
        let mut config = InvupConfig::default();
        config.firebase.storage_bucket.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }
}
