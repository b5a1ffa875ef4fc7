//! API Module
//!
//! HTTP handlers and routing exposing the cache over REST.
//!
//! # Endpoints
//! - `PUT|GET|DELETE /cache/:namespace/:key` - Set, get or delete a key
//! - `GET /cache/:namespace/:key/exists` - Existence check
//! - `PUT /cache/:namespace/:key/ttl` - Replace a key's TTL
//! - `DELETE /cache/:namespace` - Clear a namespace
//! - `GET /stats[/:namespace]` - Cache statistics
//! - `GET /metrics` - Prometheus text metrics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
