//! Spreadsheet ingestors
//!
//! Each ingestor maps header-keyed rows from one kind of upload into the
//! normalized records persisted for that source. Rows missing a required
//! field are dropped and counted, never reported one by one.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{InvoiceLine, OrderItem, ProductRecord, SalesFigures, TransitEntry};
use crate::normalize::{
    find_column_value, normalize_sku_cell, parse_leading_int, parse_locale_decimal,
    parse_locale_number, parse_spreadsheet_date, SheetRow,
};
use crate::types::{Brand, Month, MonthlySales, ProductType};

/// Upper bound on a single transit line; larger values are typing errors
pub const TRANSIT_QUANTITY_CAP: i64 = 99_999;

const CODE_COLUMNS: &[&str] = &["Código", "Codigo", "SKU"];
const DESCRIPTION_COLUMNS: &[&str] = &["Descrição", "Descricao", "Produto"];
const FACTORY_COLUMNS: &[&str] = &["Fábrica", "Ref"];
const STOCK_COLUMNS: &[&str] = &["Disp", "Estoque", "Saldo"];

const TRANSIT_CODE_COLUMNS: &[&str] = &["Cod. Produto", "SKU", "Código"];
const TRANSIT_QUANTITY_COLUMNS: &[&str] = &["Quantidade", "Qtd"];
const TRANSIT_DATE_COLUMNS: &[&str] = &["Previsão", "Data"];

const ORDER_SKU_COLUMNS: &[&str] = &["SKU", "Código"];
const ORDER_DESCRIPTION_COLUMNS: &[&str] = &["Descrição", "Produto"];
const ORDER_QUANTITY_COLUMNS: &[&str] = &["Quantidade", "Qtd"];
const ORDER_COST_COLUMNS: &[&str] = &["Custo", "Valor"];

const INVOICE_CODE_COLUMNS: &[&str] = &[
    "Cód. Prod. Fabricante",
    "Cod. Fabricante",
    "Código Fabricante",
    "Código Produto",
    "cProd",
    "Código",
];
const INVOICE_QUANTITY_COLUMNS: &[&str] = &[
    "Qtde. Comercial",
    "Quantidade Comercial",
    "Qtd. Comercial",
    "qCom",
    "Quantidade",
    "Qtd",
];
const INVOICE_KEY_COLUMNS: &[&str] = &["Chave de Acesso", "Chave NF", "Chave"];
const INVOICE_NUMBER_COLUMNS: &[&str] = &["Número NF", "Numero NF", "Nota Fiscal", "nNF", "Número"];
const INVOICE_UNIT_VALUE_COLUMNS: &[&str] = &["Valor Unitário", "Valor Unit", "vUnCom", "Valor"];

/// Records produced by one ingestion together with row counts
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IngestReport<T> {
    pub records: T,
    pub accepted: usize,
    pub skipped: usize,
}

fn text_of(row: &SheetRow, candidates: &[&str]) -> String {
    find_column_value(row, candidates)
        .map(|v| v.as_text().trim().to_string())
        .unwrap_or_default()
}

fn number_of<S: AsRef<str>>(row: &SheetRow, candidates: &[S]) -> f64 {
    find_column_value(row, candidates)
        .map(parse_locale_number)
        .unwrap_or(0.0)
}

/// Header candidates for the sales columns of a matrix-shaped sheet.
///
/// Annual totals are labelled by year (`2025`, `Vendas 25`, ...), so the
/// candidates depend on the year the upload is made in.
#[derive(Debug, Clone)]
pub struct SalesColumns {
    year_to_date: Vec<String>,
    prior_year: Vec<String>,
}

impl SalesColumns {
    pub fn for_year(year: i32) -> Self {
        let prior = year - 1;
        let short = year.rem_euclid(100);
        let prior_short = prior.rem_euclid(100);
        Self {
            year_to_date: vec![
                year.to_string(),
                format!("Vendas {:02}", short),
                format!("Total {:02}", short),
            ],
            prior_year: vec![
                prior.to_string(),
                format!("Vendas {}", prior),
                format!("Total {}", prior),
                format!("Vendas {:02}", prior_short),
            ],
        }
    }

    /// Read monthly and annual sales from a row. Full month names are tried
    /// before the three-letter abbreviations.
    pub fn read(&self, row: &SheetRow) -> SalesFigures {
        let mut by_month = MonthlySales::default();
        for month in Month::ALL {
            by_month[month] = number_of(row, &[month.full_name(), month.short_name()]);
        }
        SalesFigures {
            by_month,
            year_to_date: number_of(row, &self.year_to_date),
            prior_year: number_of(row, &self.prior_year),
        }
    }
}

// ============================================================================
// Product matrix
// ============================================================================

/// Ingest the master product/sales matrix.
///
/// Rows without a code are dropped. When a code repeats, the first row wins.
pub fn ingest_matrix(rows: &[SheetRow], year: i32) -> IngestReport<Vec<ProductRecord>> {
    let columns = SalesColumns::for_year(year);
    let mut records: Vec<ProductRecord> = Vec::with_capacity(rows.len());
    let mut seen = std::collections::HashSet::new();
    let mut skipped = 0;

    for row in rows {
        let code = find_column_value(row, CODE_COLUMNS)
            .map(normalize_sku_cell)
            .unwrap_or_default();
        if code.is_empty() || !seen.insert(code.clone()) {
            skipped += 1;
            continue;
        }

        let description = text_of(row, DESCRIPTION_COLUMNS).to_uppercase();
        records.push(ProductRecord {
            brand: Brand::infer(&description),
            product_type: ProductType::infer(&description),
            factory_reference: text_of(row, FACTORY_COLUMNS).to_uppercase(),
            stock_on_hand: number_of(row, STOCK_COLUMNS).max(0.0),
            sales: columns.read(row),
            code,
            description,
        });
    }

    IngestReport {
        accepted: records.len(),
        records,
        skipped,
    }
}

// ============================================================================
// E-commerce overlay
// ============================================================================

/// Ingest e-commerce sales keyed by SKU; repeated SKUs are summed
pub fn ingest_ecommerce(
    rows: &[SheetRow],
    year: i32,
) -> IngestReport<BTreeMap<String, SalesFigures>> {
    let columns = SalesColumns::for_year(year);
    let mut records: BTreeMap<String, SalesFigures> = BTreeMap::new();
    let mut accepted = 0;
    let mut skipped = 0;

    for row in rows {
        let code = find_column_value(row, CODE_COLUMNS)
            .map(normalize_sku_cell)
            .unwrap_or_default();
        if code.is_empty() {
            skipped += 1;
            continue;
        }
        records.entry(code).or_default().accumulate(&columns.read(row));
        accepted += 1;
    }

    IngestReport {
        records,
        accepted,
        skipped,
    }
}

// ============================================================================
// Transit
// ============================================================================

/// Ingest the in-transit shipment report.
///
/// Lines need a SKU longer than two characters and a quantity between zero
/// and [`TRANSIT_QUANTITY_CAP`], both exclusive.
pub fn ingest_transit(rows: &[SheetRow]) -> IngestReport<BTreeMap<String, TransitEntry>> {
    let mut records: BTreeMap<String, TransitEntry> = BTreeMap::new();
    let mut accepted = 0;
    let mut skipped = 0;

    for row in rows {
        let sku = find_column_value(row, TRANSIT_CODE_COLUMNS)
            .map(normalize_sku_cell)
            .unwrap_or_default();
        let quantity = find_column_value(row, TRANSIT_QUANTITY_COLUMNS)
            .and_then(parse_leading_int)
            .unwrap_or(0);

        if sku.chars().count() <= 2 || quantity <= 0 || quantity >= TRANSIT_QUANTITY_CAP {
            skipped += 1;
            continue;
        }

        let date = find_column_value(row, TRANSIT_DATE_COLUMNS).and_then(parse_spreadsheet_date);
        records
            .entry(sku)
            .or_default()
            .add_shipment(quantity as u32, date);
        accepted += 1;
    }

    IngestReport {
        records,
        accepted,
        skipped,
    }
}

// ============================================================================
// Purchase order items
// ============================================================================

/// Ingest draft items for a new purchase order.
///
/// A missing or non-positive quantity defaults to one unit.
pub fn ingest_order_items(rows: &[SheetRow]) -> IngestReport<Vec<OrderItem>> {
    let mut records = Vec::new();
    let mut skipped = 0;

    for row in rows {
        let sku = find_column_value(row, ORDER_SKU_COLUMNS)
            .map(normalize_sku_cell)
            .unwrap_or_default();
        if sku.is_empty() {
            skipped += 1;
            continue;
        }

        let quantity = find_column_value(row, ORDER_QUANTITY_COLUMNS)
            .and_then(parse_leading_int)
            .filter(|q| *q > 0)
            .map(|q| u32::try_from(q).unwrap_or(u32::MAX))
            .unwrap_or(1);
        let unit_cost = find_column_value(row, ORDER_COST_COLUMNS)
            .map(parse_locale_decimal)
            .unwrap_or_default();

        records.push(OrderItem::new(
            &sku,
            &text_of(row, FACTORY_COLUMNS).to_uppercase(),
            &text_of(row, ORDER_DESCRIPTION_COLUMNS),
            quantity,
            unit_cost,
        ));
    }

    IngestReport {
        accepted: records.len(),
        records,
        skipped,
    }
}

// ============================================================================
// Invoice (NF) report
// ============================================================================

/// Ingest an invoice report for reconciliation.
///
/// Lines without a product code, an access key or a positive commercial
/// quantity are dropped.
pub fn ingest_invoice_report(rows: &[SheetRow]) -> IngestReport<Vec<InvoiceLine>> {
    let mut records = Vec::new();
    let mut skipped = 0;

    for row in rows {
        let factory_code = find_column_value(row, INVOICE_CODE_COLUMNS)
            .map(normalize_sku_cell)
            .unwrap_or_default();
        let access_key = find_column_value(row, INVOICE_KEY_COLUMNS)
            .map(normalize_sku_cell)
            .unwrap_or_default();
        let quantity = number_of(row, INVOICE_QUANTITY_COLUMNS).round();

        if factory_code.is_empty() || access_key.is_empty() || quantity < 1.0 {
            skipped += 1;
            continue;
        }

        let invoice_number = Some(text_of(row, INVOICE_NUMBER_COLUMNS)).filter(|n| !n.is_empty());
        let unit_cost =
            find_column_value(row, INVOICE_UNIT_VALUE_COLUMNS).map(parse_locale_decimal);

        records.push(InvoiceLine {
            factory_code,
            quantity: quantity.min(u32::MAX as f64) as u32,
            access_key,
            invoice_number,
            unit_cost,
        });
    }

    IngestReport {
        accepted: records.len(),
        records,
        skipped,
    }
}
