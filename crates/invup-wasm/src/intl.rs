//! Currency formatting through the platform's `Intl.NumberFormat`.

use js_sys::{Array, Function, Intl, Object, Reflect};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use wasm_bindgen::prelude::*;

pub const LOCALE: &str = "he-IL";
pub const CURRENCY: &str = "ILS";

/// A bound `Intl.NumberFormat(LOCALE, {style: "currency", currency: CURRENCY}).format`.
pub struct CurrencyFormat {
    format: Function,
}

impl CurrencyFormat {
    pub fn he_il() -> Result<Self, JsValue> {
        let locales = Array::of1(&LOCALE.into());
        let options = Object::new();
        Reflect::set(&options, &"style".into(), &"currency".into())?;
        Reflect::set(&options, &"currency".into(), &CURRENCY.into())?;

        Ok(Self {
            format: Intl::NumberFormat::new(&locales, &options).format(),
        })
    }

    pub fn format(&self, amount: f64) -> String {
        self.format
            .call1(&JsValue::NULL, &amount.into())
            .ok()
            .and_then(|formatted| formatted.as_string())
            .unwrap_or_else(|| invup_core::format_currency_f64(amount))
    }

    pub fn format_decimal(&self, amount: Decimal) -> String {
        match amount.to_f64() {
            Some(value) => self.format(value),
            None => invup_core::format_currency(amount),
        }
    }
}
