//! Multisplit dashboard server
//!
//! Inventory and sales dashboard for an air-conditioning distributor, with a
//! purchase-order tracker reconciled against supplier invoice reports.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use crate::config::Config;

use crate::services::{spawn_view_invalidation, ViewCache};
use crate::store::SharedStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Arc<Config>,
    pub views: ViewCache,
}

impl AppState {
    /// Build the state and start dropping cached views on snapshot changes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(store: SharedStore, config: Config) -> Self {
        let views = ViewCache::new();
        spawn_view_invalidation(&store, views.clone());
        Self {
            store,
            config: Arc::new(config),
            views,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes(&state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Multisplit Dashboard API v1.0"
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
