//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, exists_handler, get_handler, health_handler, metrics_handler,
    namespace_stats_handler, set_handler, stats_handler, ttl_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache/:namespace/:key` - Store a value
/// - `GET /cache/:namespace/:key` - Retrieve a value
/// - `DELETE /cache/:namespace/:key` - Delete a key
/// - `GET /cache/:namespace/:key/exists` - Existence check
/// - `PUT /cache/:namespace/:key/ttl` - Replace a key's TTL
/// - `DELETE /cache/:namespace` - Clear a namespace
/// - `GET /stats`, `GET /stats/:namespace` - Cache statistics
/// - `GET /metrics` - Prometheus text metrics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/cache/:namespace/:key",
            put(set_handler).get(get_handler).delete(delete_handler),
        )
        .route("/cache/:namespace/:key/exists", get(exists_handler))
        .route("/cache/:namespace/:key/ttl", put(ttl_handler))
        .route("/cache/:namespace", axum::routing::delete(clear_handler))
        .route("/stats", get(stats_handler))
        .route("/stats/:namespace", get(namespace_stats_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
