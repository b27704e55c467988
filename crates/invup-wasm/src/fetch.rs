//! The extraction backend reached through the browser's `fetch`.

use async_trait::async_trait;
use js_sys::{Array, Uint8Array};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, FormData, Headers, Request, RequestInit, Response};

use invup_core::backend::{
    self, ExtractionApi, FILE_FIELD, STORAGE_URL_FIELD, UPLOAD_PATH, endpoint_url,
};
use invup_core::models::config::FirebaseConfig;
use invup_core::{BackendError, ProcessingResponse, SelectedFile, interpret_response};

use crate::js_error_message;

fn transport(error: JsValue) -> BackendError {
    BackendError::Transport(js_error_message(&error))
}

fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

fn to_blob(file: &SelectedFile) -> Result<Blob, JsValue> {
    let parts = Array::of1(&Uint8Array::from(file.bytes.as_slice()));
    let options = BlobPropertyBag::new();
    options.set_type(&file.mime_type);
    Blob::new_with_u8_array_sequence_and_options(&parts, &options)
}

async fn send(request: &Request) -> Result<(u16, String), JsValue> {
    let response: Response = JsFuture::from(window()?.fetch_with_request(request))
        .await?
        .dyn_into()?;
    let status = response.status();
    let body = JsFuture::from(response.text()?).await?;
    Ok((status, body.as_string().unwrap_or_default()))
}

/// Backend client using `window.fetch`.
pub struct FetchBackend {
    base_url: String,
}

impl FetchBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn request(&self, file: &SelectedFile, storage_url: &str) -> Result<Request, JsValue> {
        let form = FormData::new()?;
        form.append_with_blob_and_filename(FILE_FIELD, &to_blob(file)?, &file.name)?;
        form.append_with_str(STORAGE_URL_FIELD, storage_url)?;

        let headers = Headers::new()?;
        headers.set("Accept", "application/json")?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_body(&form);
        init.set_headers(&headers);

        Request::new_with_str_and_init(&endpoint_url(&self.base_url, UPLOAD_PATH), &init)
    }
}

#[async_trait(?Send)]
impl ExtractionApi for FetchBackend {
    async fn extract(
        &self,
        file: &SelectedFile,
        storage_url: &str,
    ) -> backend::Result<ProcessingResponse> {
        let request = self.request(file, storage_url).map_err(transport)?;
        let (status, body) = send(&request).await.map_err(transport)?;
        interpret_response(status, &body)
    }
}

/// Fetch the Firebase web config served by the frontend.
pub async fn fetch_firebase_config(url: &str) -> Result<FirebaseConfig, JsValue> {
    let headers = Headers::new()?;
    headers.set("Accept", "application/json")?;
    let init = RequestInit::new();
    init.set_method("GET");
    init.set_headers(&headers);

    let (status, body) = send(&Request::new_with_str_and_init(url, &init)?).await?;
    if !(200..300).contains(&status) {
        return Err(JsValue::from_str(&format!("{} answered {}", url, status)));
    }
    serde_json::from_str(&body).map_err(|e| JsValue::from_str(&e.to_string()))
}
