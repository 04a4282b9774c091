use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::SearchIndex;
use crate::metrics::SearchMetrics;

use super::handlers::*;

/// Application state shared across all handlers
pub struct AppState {
    pub index: Arc<SearchIndex>,
    pub metrics: Arc<SearchMetrics>,
}

impl AppState {
    pub fn new(index: Arc<SearchIndex>, metrics: Arc<SearchMetrics>) -> Self {
        Self { index, metrics }
    }
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Document operations
        .route("/documents", post(add_document).get(list_documents))
        .route("/documents/batch", post(batch_add))
        .route("/documents/:id", get(get_document).delete(delete_document))
        // Search
        .route("/search", post(search))
        // Maintenance
        .route("/stats", get(stats))
        .route("/compact", post(compact))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
