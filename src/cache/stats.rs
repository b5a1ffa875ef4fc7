//! Cache Statistics Module
//!
//! Tracks hit/miss counters per namespace and key, eviction counts per
//! namespace and reason, and builds the reports returned by `stats`.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::cache::EvictionReason;
use crate::config::{CacheConfig, CacheType, EvictionPolicy};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct KeyCounters {
    hits: u64,
    misses: u64,
}

// == Cache Counters ==
/// Hit/miss counters keyed by `namespace` then `key`, plus eviction counts.
///
/// Counters live for the process only; they are never persisted.
#[derive(Debug, Clone, Default)]
pub struct CacheCounters {
    access: HashMap<String, HashMap<String, KeyCounters>>,
    evictions: HashMap<String, BTreeMap<EvictionReason, u64>>,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    pub fn record_hit(&mut self, namespace: &str, key: &str) {
        self.entry(namespace, key).hits += 1;
    }

    // == Record Miss ==
    pub fn record_miss(&mut self, namespace: &str, key: &str) {
        self.entry(namespace, key).misses += 1;
    }

    // == Record Eviction ==
    pub fn record_evictions(&mut self, namespace: &str, reason: EvictionReason, count: u64) {
        if count == 0 {
            return;
        }
        *self
            .evictions
            .entry(namespace.to_string())
            .or_default()
            .entry(reason)
            .or_insert(0) += count;
    }

    /// Per-key hit counts for a namespace, used by LFU eviction.
    pub fn namespace_hits(&self, namespace: &str) -> HashMap<&str, u64> {
        self.access
            .get(namespace)
            .map(|keys| {
                keys.iter()
                    .map(|(key, c)| (key.as_str(), c.hits))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Summed (hits, misses) across every key of a namespace.
    pub fn namespace_totals(&self, namespace: &str) -> (u64, u64) {
        self.access.get(namespace).map_or((0, 0), |keys| {
            keys.values()
                .fold((0, 0), |(h, m), c| (h + c.hits, m + c.misses))
        })
    }

    pub fn evictions_for(&self, namespace: &str) -> BTreeMap<EvictionReason, u64> {
        self.evictions.get(namespace).cloned().unwrap_or_default()
    }

    /// Namespaces that have seen any traffic or evictions.
    pub fn namespaces(&self) -> impl Iterator<Item = &String> {
        self.access.keys().chain(self.evictions.keys())
    }

    fn entry(&mut self, namespace: &str, key: &str) -> &mut KeyCounters {
        self.access
            .entry(namespace.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default()
    }
}

// == Namespace Stats ==
/// Statistics for one namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NamespaceStats {
    /// Items currently stored, including expired-but-unswept ones
    pub items: usize,
    /// Items past their expiry that no sweep or lookup has removed yet
    pub expired_items: usize,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses), 0.0 with no observations
    pub hit_rate: f64,
    /// Eviction counts by reason
    pub evictions: BTreeMap<EvictionReason, u64>,
}

impl NamespaceStats {
    pub fn new(
        items: usize,
        expired_items: usize,
        hits: u64,
        misses: u64,
        evictions: BTreeMap<EvictionReason, u64>,
    ) -> Self {
        Self {
            items,
            expired_items,
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
            evictions,
        }
    }
}

// == Stats Report ==
/// Config snapshot plus per-namespace statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub enabled: bool,
    pub cache_type: CacheType,
    pub eviction_policy: EvictionPolicy,
    pub max_items: usize,
    pub default_ttl_seconds: Option<u64>,
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

impl StatsReport {
    pub fn new(config: &CacheConfig, enabled: bool) -> Self {
        Self {
            enabled,
            cache_type: config.cache_type,
            eviction_policy: config.eviction_policy,
            max_items: config.max_items,
            default_ttl_seconds: config.default_ttl_seconds,
            namespaces: BTreeMap::new(),
        }
    }

    /// Total hits across the reported namespaces.
    pub fn total_hits(&self) -> u64 {
        self.namespaces.values().map(|ns| ns.hits).sum()
    }

    /// Total misses across the reported namespaces.
    pub fn total_misses(&self) -> u64 {
        self.namespaces.values().map(|ns| ns.misses).sum()
    }

    /// Overall hit rate across the reported namespaces.
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.total_hits(), self.total_misses())
    }
}

// == Hit Rate ==
/// Calculates hits / (hits + misses), or 0.0 if no requests have been made.
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
