//! Cache Module
//!
//! Provides the namespaced cache: items, namespaces, eviction, statistics
//! and the [`CacheManager`] facade.

mod eviction;
mod item;
mod manager;
mod namespace;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use eviction::{
    select_victims, Candidate, EvictionReason, EvictionStrategy, FifoEviction, LfuEviction,
    LruEviction, RandomEviction,
};
pub use item::{CacheItem, Metadata};
pub use manager::{CacheManager, SetOptions, Ttl, ALL_NAMESPACES, DEFAULT_NAMESPACE};
pub use namespace::Namespace;
pub use stats::{hit_rate, CacheCounters, NamespaceStats, StatsReport};
