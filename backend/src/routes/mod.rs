//! Route definitions for the multisplit dashboard API

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - spreadsheet uploads
        .nest("/uploads", upload_routes(state))
        // Protected routes - dashboard and brand detail
        .nest("/dashboard", dashboard_routes(state))
        // Protected routes - delivery calendar and exports
        .merge(report_routes(state))
        // Protected routes - purchase orders
        .nest("/orders", order_routes(state))
}

/// Spreadsheet upload routes (protected)
fn upload_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_upload_status))
        .route("/matrix", post(handlers::upload_matrix))
        .route("/ecommerce", post(handlers::upload_ecommerce))
        .route("/transit", post(handlers::upload_transit))
        .layer(DefaultBodyLimit::max(
            state.config.uploads.max_bytes + MULTIPART_OVERHEAD,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Dashboard routes (protected)
fn dashboard_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_dashboard))
        .route("/products", get(handlers::list_products))
        .route("/brands/:brand", get(handlers::get_brand_detail))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Delivery calendar and export routes (protected)
fn report_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/schedule", get(handlers::get_schedule))
        .route("/exports", get(handlers::export_report))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Purchase order routes (protected)
fn order_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route(
            "/:id",
            get(handlers::get_order).delete(handlers::delete_order),
        )
        .route(
            "/:id/items/:item_id/actions",
            post(handlers::apply_item_action),
        )
        .route("/import-items", post(handlers::import_order_items))
        .route("/reconcile", post(handlers::reconcile_invoices))
        .layer(DefaultBodyLimit::max(
            state.config.uploads.max_bytes + MULTIPART_OVERHEAD,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
