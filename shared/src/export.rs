//! Report export builder
//!
//! Builds the tabular brand report. Rendering to a file format is left to
//! the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metrics::{channel_figures, coverage_days, TimeContext, NO_SALES_COVERAGE_DAYS};
use crate::models::{ProductRecord, SalesFigures, TransitEntry};
use crate::types::{Brand, ProductType, SalesChannel};

pub const SHEET_NAME: &str = "Relatório";
/// Coverage label for products with stock and no recent sales
pub const NO_SALES_LABEL: &str = "Sem Venda";
const DEFAULT_BASE_FILENAME: &str = "relatorio";

/// What to export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    pub brand: Brand,
    #[serde(default)]
    pub channel: SalesChannel,
    /// `None` exports every type
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub include_zero_sales: bool,
    #[serde(default)]
    pub base_filename: String,
}

impl ExportConfig {
    /// `{base}_{BRAND}_{CHANNEL}_{TYPE}` without extension
    pub fn file_stem(&self) -> String {
        let base = self.base_filename.trim();
        let base = if base.is_empty() {
            DEFAULT_BASE_FILENAME
        } else {
            base
        };
        let type_token = self
            .product_type
            .map(|t| t.label().to_uppercase())
            .unwrap_or_else(|| "TODOS".to_string());
        format!(
            "{}_{}_{}_{}",
            base,
            self.brand,
            self.channel.file_token(),
            type_token
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ExportCell {
    Number(f64),
    Text(String),
}

impl ExportCell {
    pub fn text(value: impl Into<String>) -> Self {
        ExportCell::Text(value.into())
    }
}

/// A built report, ready to render
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportTable {
    pub sheet_name: String,
    pub file_stem: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ExportCell>>,
}

impl ExportTable {
    /// Number of sales columns, used by report consumers to locate stock
    pub fn sales_column_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| c.starts_with("Vendas "))
            .count()
    }
}

fn sales_columns(channel: SalesChannel, prior_year: i32, year: i32) -> Vec<String> {
    [prior_year, year]
        .iter()
        .flat_map(|y| match channel {
            SalesChannel::Total => vec![
                format!("Vendas {} {}", SalesChannel::Store.label(), y),
                format!("Vendas {} {}", SalesChannel::Ecommerce.label(), y),
                format!("Vendas {} {}", SalesChannel::Total.label(), y),
            ],
            other => vec![format!("Vendas {} {}", other.label(), y)],
        })
        .collect()
}

fn sales_cells(
    channel: SalesChannel,
    total: &SalesFigures,
    ecommerce: Option<&SalesFigures>,
) -> Vec<ExportCell> {
    let channels: &[SalesChannel] = match channel {
        SalesChannel::Total => &[
            SalesChannel::Store,
            SalesChannel::Ecommerce,
            SalesChannel::Total,
        ],
        SalesChannel::Store => &[SalesChannel::Store],
        SalesChannel::Ecommerce => &[SalesChannel::Ecommerce],
    };
    let figures: Vec<SalesFigures> = channels
        .iter()
        .map(|c| channel_figures(total, ecommerce, *c))
        .collect();

    figures
        .iter()
        .map(|f| ExportCell::Number(f.prior_year))
        .chain(figures.iter().map(|f| ExportCell::Number(f.year_to_date)))
        .collect()
}

/// Build the brand report for the given configuration.
///
/// Unless zero sales are included, products without year-to-date sales in
/// the selected channel are left out. Coverage is recomputed from the
/// selected channel's figures.
pub fn build_export(
    matrix: &[ProductRecord],
    ecommerce: &BTreeMap<String, SalesFigures>,
    transit: &BTreeMap<String, TransitEntry>,
    time: &TimeContext,
    config: &ExportConfig,
) -> ExportTable {
    let mut columns = vec![
        "SKU".to_string(),
        "Descrição".to_string(),
        "Cód. Fabricante".to_string(),
        "Tipo".to_string(),
    ];
    columns.extend(sales_columns(config.channel, time.year - 1, time.year));
    columns.extend(
        ["Estoque Físico", "Trânsito", "Dias de Estoque"]
            .iter()
            .map(|c| c.to_string()),
    );

    let rows = matrix
        .iter()
        .filter(|p| p.brand == config.brand)
        .filter(|p| config.product_type.map_or(true, |t| p.product_type == t))
        .filter_map(|product| {
            let overlay = ecommerce.get(&product.code);
            let figures = channel_figures(&product.sales, overlay, config.channel);
            if !config.include_zero_sales && figures.year_to_date <= 0.0 {
                return None;
            }

            let transit_quantity = transit.get(&product.code).map(|t| t.quantity).unwrap_or(0);
            let (window_sales, window_days) = time.velocity_window(&figures);
            let coverage = coverage_days(
                window_sales,
                window_days,
                product.stock_on_hand + f64::from(transit_quantity),
            );

            let mut row = vec![
                ExportCell::text(&product.code),
                ExportCell::text(&product.description),
                ExportCell::text(&product.factory_reference),
                ExportCell::text(product.product_type.label()),
            ];
            row.extend(sales_cells(config.channel, &product.sales, overlay));
            row.push(ExportCell::Number(product.stock_on_hand));
            row.push(ExportCell::Number(f64::from(transit_quantity)));
            row.push(if coverage == NO_SALES_COVERAGE_DAYS {
                ExportCell::text(NO_SALES_LABEL)
            } else {
                ExportCell::Number(f64::from(coverage))
            });
            Some(row)
        })
        .collect();

    ExportTable {
        sheet_name: SHEET_NAME.to_string(),
        file_stem: config.file_stem(),
        columns,
        rows,
    }
}
