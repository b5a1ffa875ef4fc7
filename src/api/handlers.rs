//! API Handlers
//!
//! HTTP request handlers exposing the cache facade.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::cache::{CacheManager, StatsReport, ALL_NAMESPACES};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::metrics::InMemoryMetrics;
use crate::models::{
    validate_key, ClearResponse, DeleteResponse, ExistsResponse, GetResponse, HealthResponse,
    SetRequest, SetResponse, TtlRequest, TtlResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache handle
    pub cache: CacheManager,
    /// Registry the cache reports to, served on `/metrics`
    pub metrics: Arc<InMemoryMetrics>,
}

impl AppState {
    /// Creates a new AppState with a fresh cache and metrics registry.
    pub fn new(config: CacheConfig) -> Self {
        let metrics = Arc::new(InMemoryMetrics::new());
        let cache = CacheManager::with_metrics(config, metrics.clone());
        Self { cache, metrics }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(config.cache.clone())
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(message) => Err(CacheError::InvalidRequest(message)),
        None => Ok(()),
    }
}

/// Handler for PUT /cache/:namespace/:key
pub async fn set_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    check_key(&key)?;

    let options = req.options(&namespace);
    let value = state.cache.set_with(&key, req.value, options).await;

    Ok(Json(SetResponse::new(namespace, key, value)))
}

/// Handler for GET /cache/:namespace/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key, &namespace).await {
        Some(value) => Ok(Json(GetResponse::new(namespace, key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /cache/:namespace/:key/exists
pub async fn exists_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Json<ExistsResponse> {
    let exists = state.cache.has(&key, &namespace).await;
    Json(ExistsResponse { key, exists })
}

/// Handler for DELETE /cache/:namespace/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Json<DeleteResponse> {
    let deleted = state.cache.delete(&key, &namespace).await;
    Json(DeleteResponse { key, deleted })
}

/// Handler for PUT /cache/:namespace/:key/ttl
pub async fn ttl_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
    Json(req): Json<TtlRequest>,
) -> Json<TtlResponse> {
    let updated = state.cache.set_ttl(&key, req.ttl, &namespace).await;
    Json(TtlResponse { key, updated })
}

/// Handler for DELETE /cache/:namespace
pub async fn clear_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Json<ClearResponse> {
    let cleared = state.cache.clear(&namespace).await;
    Json(ClearResponse { namespace, cleared })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsReport> {
    Json(state.cache.stats(ALL_NAMESPACES).await)
}

/// Handler for GET /stats/:namespace
pub async fn namespace_stats_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Json<StatsReport> {
    Json(state.cache.stats(&namespace).await)
}

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.is_enabled()))
}
