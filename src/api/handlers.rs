use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Instant;

use crate::api::types::*;
use crate::engine::SearchIndex;
use crate::error::HamftsError;
use crate::metrics::SearchMetrics;
use crate::models::Document;

use super::router::AppState;

/// Error wrapper for API handlers
pub enum ApiError {
    Index(HamftsError),
    Internal(String),
}

impl From<HamftsError> for ApiError {
    fn from(e: HamftsError) -> Self {
        ApiError::Index(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Index(e) => {
                let status = match &e {
                    HamftsError::NotFound(_) => StatusCode::NOT_FOUND,
                    HamftsError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
                    HamftsError::Closed => StatusCode::SERVICE_UNAVAILABLE,
                    HamftsError::Io(_)
                    | HamftsError::CorruptRecord { .. }
                    | HamftsError::CorruptSnapshot(_)
                    | HamftsError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind(), e.to_string())
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        if status.is_server_error() {
            tracing::error!(error = error_type, %message, "request failed");
        }

        (status, Json(ErrorResponse::new(error_type, message))).into_response()
    }
}

/// Run a blocking index operation off the async executor
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("index task failed: {}", e)))?
        .map_err(ApiError::from)
}

fn refresh_gauges(index: &SearchIndex, metrics: &SearchMetrics) {
    if let Ok(stats) = index.stats() {
        metrics.set_index_size(stats.document_count, stats.store_size_bytes);
    }
}

/// Search documents containing every query term
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let start = Instant::now();
    let index = state.index.clone();
    let result = blocking(move || index.search(&req.query)).await;

    match result {
        Ok(docs) => {
            state.metrics.record_search(start.elapsed().as_secs_f64());
            Ok(Json(docs))
        }
        Err(e) => {
            state.metrics.record_search_error();
            Err(e)
        }
    }
}

/// Add a single document
pub async fn add_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let start = Instant::now();
    let doc = req.into_document()?;
    let index = state.index.clone();
    let metrics = state.metrics.clone();

    blocking(move || {
        index.add_document(doc)?;
        refresh_gauges(&index, &metrics);
        Ok(())
    })
    .await?;
    state.metrics.record_add(1, start.elapsed().as_secs_f64());

    Ok((StatusCode::CREATED, Json(AddResponse { added: 1 })))
}

/// Add a batch of documents under a single write
pub async fn batch_add(
    State(state): State<Arc<AppState>>,
    Json(requests): Json<Vec<DocumentRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let start = Instant::now();
    let docs = requests
        .into_iter()
        .map(DocumentRequest::into_document)
        .collect::<crate::Result<Vec<Document>>>()?;
    let index = state.index.clone();
    let metrics = state.metrics.clone();

    let added = blocking(move || {
        let added = index.add_documents(docs)?;
        refresh_gauges(&index, &metrics);
        Ok(added)
    })
    .await?;
    state.metrics.record_add(added, start.elapsed().as_secs_f64());

    Ok((StatusCode::CREATED, Json(AddResponse { added })))
}

/// List the ids of all documents
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let index = state.index.clone();
    let ids = blocking(move || index.list_ids()).await?;
    Ok(Json(ids))
}

/// Get a document by id
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let index = state.index.clone();
    let lookup = id.clone();
    match blocking(move || index.get_document(&lookup)).await? {
        Some(doc) => Ok(Json(doc)),
        None => Err(ApiError::Index(HamftsError::NotFound(id))),
    }
}

/// Delete a document; deleting an unknown id succeeds
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let start = Instant::now();
    let index = state.index.clone();
    let metrics = state.metrics.clone();

    let removed = blocking(move || {
        let removed = index.delete_document(&id)?;
        refresh_gauges(&index, &metrics);
        Ok(removed)
    })
    .await?;
    if removed {
        state.metrics.record_delete(start.elapsed().as_secs_f64());
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Index-wide counters
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let index = state.index.clone();
    let stats = blocking(move || index.stats()).await?;
    state
        .metrics
        .set_index_size(stats.document_count, stats.store_size_bytes);
    Ok(Json(stats))
}

/// Rewrite the record log without deleted documents
pub async fn compact(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let index = state.index.clone();
    let metrics = state.metrics.clone();

    let report = blocking(move || {
        let report = index.compact()?;
        refresh_gauges(&index, &metrics);
        Ok(report)
    })
    .await?;
    state.metrics.record_compaction();

    Ok(Json(report))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
    })
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let buffer = state
        .metrics
        .encode_text()
        .map_err(|e| ApiError::Internal(format!("failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        buffer,
    ))
}
