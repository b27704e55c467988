//! The upload form on the page.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlButtonElement, HtmlElement, HtmlInputElement, Window};

use invup_core::models::invoice::InvoiceData;
use invup_core::{Alert, SubmissionView, render_html_with};

use crate::intl::CurrencyFormat;
use crate::warn;

pub const FORM_ID: &str = "uploadForm";
pub const FILE_INPUT_ID: &str = "invoiceFile";
pub const LOADING_OVERLAY_ID: &str = "loadingOverlay";
pub const RESULT_ID: &str = "result";

fn element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("#{} not found", id)))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("#{} has an unexpected element type", id)))
}

fn set_display(element: &HtmlElement, value: &str) {
    if let Err(e) = element.style().set_property("display", value) {
        warn(&format!("Failed to set display: {:?}", e));
    }
}

/// The form's file input, loading overlay and result container.
pub struct DomView {
    window: Window,
    form: HtmlElement,
    input: HtmlInputElement,
    overlay: HtmlElement,
    result: HtmlElement,
    submit: Option<HtmlButtonElement>,
    currency: CurrencyFormat,
}

impl DomView {
    pub fn bind(window: Window) -> Result<Self, JsValue> {
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let form: HtmlElement = element(&document, FORM_ID)?;
        let submit = form
            .query_selector("button[type=submit]")?
            .and_then(|e| e.dyn_into::<HtmlButtonElement>().ok());

        Ok(Self {
            input: element(&document, FILE_INPUT_ID)?,
            overlay: element(&document, LOADING_OVERLAY_ID)?,
            result: element(&document, RESULT_ID)?,
            submit,
            currency: CurrencyFormat::he_il()?,
            form,
            window,
        })
    }

    pub fn form(&self) -> &HtmlElement {
        &self.form
    }

    /// The first selected file, if any.
    pub fn selected_file(&self) -> Option<web_sys::File> {
        self.input.files().and_then(|files| files.get(0))
    }

    fn set_submit_disabled(&self, disabled: bool) {
        if let Some(button) = &self.submit {
            button.set_disabled(disabled);
        }
    }
}

impl SubmissionView for DomView {
    fn show_loading(&self) {
        set_display(&self.overlay, "flex");
        self.set_submit_disabled(true);
    }

    fn hide_loading(&self) {
        set_display(&self.overlay, "none");
        self.set_submit_disabled(false);
    }

    fn alert(&self, alert: &Alert) {
        if let Err(e) = self.window.alert_with_message(&alert.to_string()) {
            warn(&format!("Failed to show alert: {:?}", e));
        }
    }

    fn show_result(&self, data: &InvoiceData) {
        let html = render_html_with(data, |amount| self.currency.format_decimal(amount));
        self.result.set_inner_html(&html);
        set_display(&self.result, "block");
    }

    fn hide_result(&self) {
        set_display(&self.result, "none");
    }
}
