//! HTTP handlers for the dashboard, brand detail and delivery calendar

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use shared::metrics::{BrandDetail, BrandQuery, EnrichedProduct};
use shared::schedule::DeliveryDay;
use shared::{Brand, SalesChannel, StockFilter};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::dashboard::{DashboardService, DashboardSummary};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub channel: SalesChannel,
    /// Reference date, defaults to today
    pub as_of: Option<NaiveDate>,
    pub brand: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BrandDetailQuery {
    #[serde(default)]
    pub channel: SalesChannel,
    pub as_of: Option<NaiveDate>,
    pub search: Option<String>,
    #[serde(default)]
    pub stock_filter: StockFilter,
    #[serde(default)]
    pub hide_zero_sales: bool,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub year: i32,
    pub month: u32,
}

pub(crate) fn reference_date(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Local::now().date_naive())
}

pub(crate) fn parse_brand(raw: &str) -> AppResult<Brand> {
    raw.parse::<Brand>()
        .map_err(|msg| AppError::validation("brand", msg, "Marca desconhecida"))
}

fn dashboard_service(state: &AppState) -> DashboardService {
    DashboardService::new(
        state.store.clone(),
        state.views.clone(),
        state.config.stock_policy,
    )
}

/// KPIs and brand ranking for a channel
pub async fn get_dashboard(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ViewQuery>,
) -> AppResult<Json<DashboardSummary>> {
    let service = dashboard_service(&state);
    let summary = service
        .summary(reference_date(query.as_of), query.channel)
        .await?;
    Ok(Json(summary))
}

/// Enriched product rows for a channel
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ViewQuery>,
) -> AppResult<Json<Vec<EnrichedProduct>>> {
    let brand = query.brand.as_deref().map(parse_brand).transpose()?;
    let service = dashboard_service(&state);
    let products = service
        .products(reference_date(query.as_of), query.channel, brand)
        .await?;
    Ok(Json(products))
}

/// Drill-down for one brand
pub async fn get_brand_detail(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(brand): Path<String>,
    Query(query): Query<BrandDetailQuery>,
) -> AppResult<Json<BrandDetail>> {
    let brand = parse_brand(&brand)?;
    let filters = BrandQuery {
        search: query.search,
        stock_filter: query.stock_filter,
        hide_zero_sales: query.hide_zero_sales,
    };

    let service = dashboard_service(&state);
    let detail = service
        .brand_detail(reference_date(query.as_of), query.channel, brand, &filters)
        .await?;
    Ok(Json(detail))
}

/// Expected arrivals for a month
pub async fn get_schedule(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ScheduleQuery>,
) -> AppResult<Json<Vec<DeliveryDay>>> {
    let service = dashboard_service(&state);
    let days = service.calendar(query.year, query.month).await?;
    Ok(Json(days))
}
