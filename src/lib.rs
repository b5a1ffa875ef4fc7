//! nscache - An embeddable namespaced key-value cache
//!
//! Provides namespaced storage with TTL expiration, pluggable eviction,
//! background reclamation and optional disk persistence, plus a small HTTP
//! server exposing it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod persistence;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, SetOptions, Ttl, ALL_NAMESPACES, DEFAULT_NAMESPACE};
pub use config::{CacheConfig, CacheType, Config, EvictionPolicy};
pub use error::{CacheError, Result};
pub use metrics::{InMemoryMetrics, MetricsSink};
pub use tasks::spawn_reclamation_task;
