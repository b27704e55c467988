//! Bindings to the page's Firebase JS SDK (namespaced API).

use async_trait::async_trait;
use js_sys::{Object, Promise, Reflect, Uint8Array};
use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use invup_core::StorageError;
use invup_core::models::config::FirebaseConfig;
use invup_core::storage::{self, ObjectStore};
use invup_core::telemetry::{Properties, TelemetryEvent, TelemetrySink};

use crate::{js_error_message, warn};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = firebase, js_name = initializeApp)]
    fn initialize_app(config: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = firebase, js_name = storage)]
    fn storage_service() -> Result<Storage, JsValue>;

    #[wasm_bindgen(catch, js_namespace = firebase, js_name = analytics)]
    fn analytics_service() -> Result<Analytics, JsValue>;

    pub type Storage;

    #[wasm_bindgen(method, js_name = ref)]
    fn root(this: &Storage) -> Reference;

    pub type Reference;

    #[wasm_bindgen(method)]
    fn child(this: &Reference, path: &str) -> Reference;

    // Returns an UploadTask, which is a thenable.
    #[wasm_bindgen(method, catch)]
    fn put(this: &Reference, data: &Uint8Array, metadata: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = getDownloadURL)]
    fn get_download_url(this: &Reference) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn delete(this: &Reference) -> Result<Promise, JsValue>;

    pub type Analytics;

    #[wasm_bindgen(method, catch, js_name = logEvent)]
    fn log_event(this: &Analytics, name: &str, params: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setUserProperties)]
    fn set_user_properties(this: &Analytics, properties: &JsValue) -> Result<(), JsValue>;
}

/// Serialize to plain JS objects rather than `Map`s.
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Initialize the default Firebase app.
pub fn initialize(config: &FirebaseConfig) -> Result<(), JsValue> {
    initialize_app(&to_js(config)?)?;
    Ok(())
}

fn sdk_error(error: JsValue) -> StorageError {
    StorageError::Sdk(js_error_message(&error))
}

/// Object store backed by `firebase.storage()`.
pub struct FirebaseSdkStore {
    root: Reference,
}

impl FirebaseSdkStore {
    /// Bind to the storage service of the initialized default app.
    pub fn connect() -> Result<Self, JsValue> {
        Ok(Self {
            root: storage_service()?.root(),
        })
    }
}

#[async_trait(?Send)]
impl ObjectStore for FirebaseSdkStore {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> storage::Result<String> {
        let reference = self.root.child(path);

        let metadata = Object::new();
        Reflect::set(&metadata, &"contentType".into(), &content_type.into()).map_err(sdk_error)?;

        let task = reference
            .put(&Uint8Array::from(bytes), &metadata)
            .map_err(sdk_error)?;
        JsFuture::from(Promise::resolve(&task)).await.map_err(sdk_error)?;

        let url = JsFuture::from(reference.get_download_url().map_err(sdk_error)?)
            .await
            .map_err(sdk_error)?;
        url.as_string()
            .ok_or_else(|| StorageError::InvalidResponse("download URL is not a string".to_string()))
    }

    async fn delete(&self, path: &str) -> storage::Result<()> {
        let promise = self.root.child(path).delete().map_err(sdk_error)?;
        JsFuture::from(promise).await.map_err(sdk_error)?;
        Ok(())
    }
}

/// Telemetry sink backed by `firebase.analytics()`.
pub struct AnalyticsSink {
    analytics: Analytics,
}

impl AnalyticsSink {
    pub fn connect() -> Result<Self, JsValue> {
        Ok(Self {
            analytics: analytics_service()?,
        })
    }
}

impl TelemetrySink for AnalyticsSink {
    fn emit(&self, event: TelemetryEvent) {
        let delivered = to_js(&event.properties)
            .and_then(|params| self.analytics.log_event(&event.name, &params));
        if let Err(e) = delivered {
            warn(&format!("Failed to log {}: {}", event.name, js_error_message(&e)));
        }
    }

    fn set_user_properties(&self, properties: Properties) {
        let set = to_js(&properties).and_then(|p| self.analytics.set_user_properties(&p));
        if let Err(e) = set {
            warn(&format!("Failed to set user properties: {}", js_error_message(&e)));
        }
    }
}
