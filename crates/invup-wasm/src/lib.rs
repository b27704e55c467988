//! WASM bindings for the invoice upload client.
//!
//! [`start_app`] wires the page's upload form to the shared submission
//! workflow, with the page's Firebase SDK providing storage and analytics.

mod dom;
mod fetch;
mod firebase;
mod intl;

use std::rc::Rc;
use std::sync::Arc;

use js_sys::Uint8Array;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};

use invup_core::models::config::{ApiConfig, FirebaseConfig, InvupConfig};
use invup_core::{
    Alert, AlertKind, InvoiceData, NoopSink, RemoteStorageClient, SelectedFile, SubmissionView,
    TelemetrySink, UploadOrchestrator,
};

pub use dom::DomView;
pub use fetch::FetchBackend;
pub use firebase::{AnalyticsSink, FirebaseSdkStore};
pub use intl::CurrencyFormat;

/// Path serving the Firebase config in deployed environments.
pub const FIREBASE_CONFIG_PATH: &str = "/api/firebase-config";

type App = UploadOrchestrator<Arc<FirebaseSdkStore>, FetchBackend>;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn log(message: &str) {
    web_sys::console::log_1(&message.into());
}

pub(crate) fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

/// Best human-readable message of a thrown JS value.
pub(crate) fn js_error_message(error: &JsValue) -> String {
    if let Some(error) = error.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    if let Some(text) = error.as_string() {
        return text;
    }
    js_sys::Reflect::get(error, &"message".into())
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", error))
}

fn to_js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Format an amount as he-IL ILS currency with the browser's locale data.
#[wasm_bindgen(js_name = formatCurrency)]
pub fn format_currency(amount: f64) -> Result<String, JsValue> {
    Ok(CurrencyFormat::he_il()?.format(amount))
}

/// Render invoice data as the result table HTML.
#[wasm_bindgen(js_name = renderInvoiceHtml)]
pub fn render_invoice_html(data: JsValue) -> Result<String, JsValue> {
    let data: InvoiceData = serde_wasm_bindgen::from_value(data).map_err(to_js_error)?;
    let currency = CurrencyFormat::he_il()?;
    Ok(invup_core::render_html_with(&data, |amount| {
        currency.format_decimal(amount)
    }))
}

async fn load_firebase_config(overrides: JsValue, local: bool) -> Result<FirebaseConfig, JsValue> {
    if !overrides.is_undefined() && !overrides.is_null() {
        return serde_wasm_bindgen::from_value(overrides).map_err(to_js_error);
    }
    if local {
        return Ok(FirebaseConfig::default());
    }
    fetch::fetch_firebase_config(FIREBASE_CONFIG_PATH).await
}

async fn read_file(file: &web_sys::File) -> Result<SelectedFile, JsValue> {
    let buffer = JsFuture::from(file.array_buffer()).await?;
    Ok(SelectedFile::new(
        file.name(),
        file.type_(),
        Uint8Array::new(&buffer).to_vec(),
    ))
}

fn attach(app: Rc<App>, view: Rc<DomView>) -> Result<(), JsValue> {
    let form = view.form().clone();
    let on_submit = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        event.prevent_default();
        let app = app.clone();
        let view = view.clone();
        spawn_local(async move {
            let file = view.selected_file();
            let declared = file.as_ref().map(|f| (f.type_(), f.size() as u64));
            // Type and size are checked before the contents are read.
            let declared_ref = declared.as_ref().map(|(mime, size)| (mime.as_str(), *size));
            if app.screen(declared_ref, view.as_ref()).is_err() {
                return;
            }

            let selected = match file {
                Some(file) => match read_file(&file).await {
                    Ok(selected) => Some(selected),
                    Err(e) => {
                        view.alert(&Alert {
                            kind: AlertKind::Failure,
                            message: js_error_message(&e),
                        });
                        return;
                    }
                },
                None => None,
            };
            // Outcomes are shown by the view.
            let _ = app.submit(selected.as_ref(), view.as_ref()).await;
        });
    });

    form.add_event_listener_with_callback("submit", on_submit.as_ref().unchecked_ref())?;
    on_submit.forget();
    Ok(())
}

/// Load the Firebase config, initialize the SDK and attach the upload form.
///
/// `firebase_config` may carry the Firebase web config directly. Otherwise
/// localhost uses the built-in defaults and deployed pages fetch
/// `/api/firebase-config`.
#[wasm_bindgen(js_name = startApp)]
pub async fn start_app(firebase_config: JsValue) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let local = window
        .location()
        .hostname()
        .map(|host| host == "localhost")
        .unwrap_or(false);

    let config = InvupConfig {
        api: ApiConfig {
            local,
            ..ApiConfig::default()
        },
        firebase: load_firebase_config(firebase_config, local).await?,
        ..InvupConfig::default()
    };
    config.validate().map_err(to_js_error)?;

    firebase::initialize(&config.firebase)?;

    let telemetry: Arc<dyn TelemetrySink> = match AnalyticsSink::connect() {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            warn(&format!("Analytics unavailable: {}", js_error_message(&e)));
            Arc::new(NoopSink)
        }
    };
    let store = Arc::new(FirebaseSdkStore::connect()?);

    let app = UploadOrchestrator::from_config(
        &config,
        store.clone(),
        FetchBackend::new(config.api.effective_base_url()),
        telemetry.clone(),
    )
    .map_err(to_js_error)?;
    attach(Rc::new(app), Rc::new(DomView::bind(window)?))?;
    log("Firebase initialized successfully");

    spawn_local(async move {
        match RemoteStorageClient::new(store, telemetry).probe().await {
            Ok(()) => log("Storage connection successful"),
            Err(e) => warn(&format!("Storage connection failed: {}", e)),
        }
    });

    Ok(())
}
