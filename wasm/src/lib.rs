//! WebAssembly module for the multisplit dashboard
//!
//! Provides client-side computation for:
//! - SKU normalization and coverage days
//! - Dashboard views derived from uploaded snapshots
//! - Brand exports
//! - Invoice reconciliation previews

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use shared::export::{build_export, ExportConfig};
use shared::metrics::{derive_view, TimeContext};
use shared::reconciliation::reconcile;
use shared::{Brand, InvoiceLine, ProductRecord, PurchaseOrder, SalesChannel, SalesFigures, TransitEntry};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn from_json<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid {} JSON: {}", what, e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_date(raw: &str) -> Result<NaiveDate, JsValue> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| JsValue::from_str(&format!("Invalid date: {}", raw)))
}

fn parse_channel(raw: &str) -> Result<SalesChannel, JsValue> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "total" => Ok(SalesChannel::Total),
        "store" | "loja" => Ok(SalesChannel::Store),
        "ecommerce" | "e-commerce" => Ok(SalesChannel::Ecommerce),
        other => Err(JsValue::from_str(&format!("Unknown channel: {}", other))),
    }
}

struct Snapshots {
    matrix: Vec<ProductRecord>,
    ecommerce: BTreeMap<String, SalesFigures>,
    transit: BTreeMap<String, TransitEntry>,
}

impl Snapshots {
    fn parse(matrix_json: &str, ecommerce_json: &str, transit_json: &str) -> Result<Self, JsValue> {
        Ok(Self {
            matrix: from_json("matrix", matrix_json)?,
            ecommerce: from_json("e-commerce", ecommerce_json)?,
            transit: from_json("transit", transit_json)?,
        })
    }
}

/// Canonical SKU: upper case without any whitespace
#[wasm_bindgen]
pub fn normalize_sku(raw: &str) -> String {
    shared::normalize::normalize_sku(raw)
}

/// Days of stock left at the current sales rate; 999 when nothing sells
#[wasm_bindgen]
pub fn coverage_days(window_sales: f64, window_days: u32, available_units: f64) -> u32 {
    shared::metrics::coverage_days(window_sales, window_days, available_units)
}

/// Derive the dashboard view for a channel and return it as JSON
#[wasm_bindgen]
pub fn derive_dashboard(
    matrix_json: &str,
    ecommerce_json: &str,
    transit_json: &str,
    today: &str,
    channel: &str,
) -> Result<String, JsValue> {
    let snapshots = Snapshots::parse(matrix_json, ecommerce_json, transit_json)?;
    let time = TimeContext::from_date(parse_date(today)?);
    let view = derive_view(
        &snapshots.matrix,
        &snapshots.ecommerce,
        &snapshots.transit,
        &time,
        parse_channel(channel)?,
    );
    to_json(&view)
}

/// Build a brand export table and return it as JSON
#[wasm_bindgen]
pub fn build_export_table(
    matrix_json: &str,
    ecommerce_json: &str,
    transit_json: &str,
    today: &str,
    config_json: &str,
) -> Result<String, JsValue> {
    let snapshots = Snapshots::parse(matrix_json, ecommerce_json, transit_json)?;
    let config: ExportConfig = from_json("export config", config_json)?;
    shared::validate_base_filename(&config.base_filename).map_err(JsValue::from_str)?;

    let table = build_export(
        &snapshots.matrix,
        &snapshots.ecommerce,
        &snapshots.transit,
        &TimeContext::from_date(parse_date(today)?),
        &config,
    );
    to_json(&table)
}

/// Preview an invoice reconciliation.
///
/// Returns `{"orders": [...], "summary": {...}}` without persisting anything.
#[wasm_bindgen]
pub fn reconcile_orders(
    orders_json: &str,
    lines_json: &str,
    brand: &str,
    today: &str,
) -> Result<String, JsValue> {
    let mut orders: Vec<PurchaseOrder> = from_json("orders", orders_json)?;
    let lines: Vec<InvoiceLine> = from_json("invoice lines", lines_json)?;
    let brand: Brand = brand.parse().map_err(JsValue::from_str)?;

    let summary = reconcile(&mut orders, &lines, brand, parse_date(today)?);
    to_json(&serde_json::json!({ "orders": orders, "summary": summary }))
}
