//! Reporting handlers for brand exports

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::export::ExportConfig;
use shared::{ProductType, SalesChannel};

use crate::error::AppResult;
use crate::handlers::dashboard::{parse_brand, reference_date};
use crate::middleware::CurrentUser;
use crate::services::{DashboardService, ReportingService, XLSX_CONTENT_TYPE};
use crate::AppState;

/// Download format of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub brand: String,
    #[serde(default)]
    pub channel: SalesChannel,
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub include_zero: bool,
    pub filename: Option<String>,
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub format: ExportFormat,
}

/// Build a brand report, as an xlsx attachment unless CSV or JSON is requested
pub async fn export_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ExportQuery>,
) -> AppResult<impl IntoResponse> {
    let config = ExportConfig {
        brand: parse_brand(&query.brand)?,
        channel: query.channel,
        product_type: query.product_type,
        include_zero_sales: query.include_zero,
        base_filename: query.filename.unwrap_or_default(),
    };

    let service = DashboardService::new(
        state.store.clone(),
        state.views.clone(),
        state.config.stock_policy,
    );
    let table = service.export(reference_date(query.as_of), &config).await?;

    let (content_type, filename, body) = match query.format {
        ExportFormat::Json => return Ok(Json(table).into_response()),
        ExportFormat::Csv => (
            "text/csv; charset=utf-8",
            ReportingService::csv_filename(&table),
            ReportingService::export_to_csv(&table)?.into_bytes(),
        ),
        ExportFormat::Xlsx => (
            XLSX_CONTENT_TYPE,
            ReportingService::xlsx_filename(&table),
            ReportingService::export_to_xlsx(&table)?,
        ),
    };

    let disposition = format!("attachment; filename=\"{}\"", filename);
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
