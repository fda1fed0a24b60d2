//! HTTP handlers for purchase orders and invoice reconciliation

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::ingest::IngestReport;
use shared::{ItemAction, OrderItem, PurchaseOrder};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::dashboard::{parse_brand, reference_date};
use crate::handlers::uploads::read_upload;
use crate::middleware::CurrentUser;
use crate::services::orders::{CreateOrderInput, OrderService, ReconcileReport};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub supplier: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReconcileQuery {
    pub brand: String,
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ActionDateQuery {
    /// Date recorded in the item history, defaults to today
    pub as_of: Option<NaiveDate>,
}

/// List purchase orders, newest first
pub async fn list_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<Vec<PurchaseOrder>>> {
    let supplier = query.supplier.as_deref().map(parse_brand).transpose()?;
    let service = OrderService::new(state.store.clone());
    Ok(Json(service.list(supplier).await?))
}

/// Create a purchase order
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<PurchaseOrder>)> {
    let service = OrderService::new(state.store.clone());
    let order = service.create(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get a purchase order
pub async fn get_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    let service = OrderService::new(state.store.clone());
    Ok(Json(service.get(order_id).await?))
}

/// Delete a purchase order
pub async fn delete_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = OrderService::new(state.store.clone());
    service.delete(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record a manual invoice or schedule on an item
pub async fn apply_item_action(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ActionDateQuery>,
    Json(action): Json<ItemAction>,
) -> AppResult<Json<PurchaseOrder>> {
    let service = OrderService::new(state.store.clone());
    let order = service
        .apply_item_action(order_id, item_id, action, reference_date(query.as_of))
        .await?;
    Ok(Json(order))
}

/// Read draft order items from a spreadsheet
pub async fn import_order_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<IngestReport<Vec<OrderItem>>>> {
    let (filename, bytes) = read_upload(multipart, state.config.uploads.max_bytes).await?;
    let service = OrderService::new(state.store.clone());
    Ok(Json(service.import_items(&filename, bytes).await?))
}

/// Apply an invoice report to the open orders of a brand
pub async fn reconcile_invoices(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ReconcileQuery>,
    multipart: Multipart,
) -> AppResult<Json<ReconcileReport>> {
    let brand = parse_brand(&query.brand)?;
    let (filename, bytes) = read_upload(multipart, state.config.uploads.max_bytes).await?;
    let service = OrderService::new(state.store.clone());
    let report = service
        .reconcile(brand, &filename, bytes, reference_date(query.as_of))
        .await?;
    Ok(Json(report))
}
