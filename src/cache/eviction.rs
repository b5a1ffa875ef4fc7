//! Eviction Module
//!
//! Picks which items leave a namespace once it holds more than
//! `max_items`. One strategy per [`EvictionPolicy`].

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::cache::Namespace;
use crate::config::EvictionPolicy;

// == Eviction Reason ==
/// Why an item left a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    Expired,
    SizeLimit,
    Clear,
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Expired => "expired",
            EvictionReason::SizeLimit => "size_limit",
            EvictionReason::Clear => "clear",
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Candidate ==
/// What a strategy knows about one item when ranking victims.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub key: String,
    pub created_at: DateTime<Utc>,
    /// Insertion order within the namespace
    pub seq: u64,
    /// Global hit count for this namespace/key
    pub hits: u64,
}

// == Eviction Strategy ==
/// Ranks candidates and returns the keys to evict.
pub trait EvictionStrategy: Send + Sync {
    /// Returns up to `to_evict` keys chosen from `candidates`.
    fn select(&self, candidates: Vec<Candidate>, to_evict: usize) -> Vec<String>;
}

/// Oldest `created_at` first.
///
/// Ranks by creation time, not last access, so it currently orders
/// exactly like [`FifoEviction`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LruEviction;

/// Least hit first; never-hit items go before any hit item.
#[derive(Debug, Default, Clone, Copy)]
pub struct LfuEviction;

/// Oldest `created_at` first.
#[derive(Debug, Default, Clone, Copy)]
pub struct FifoEviction;

/// Uniformly random victims.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomEviction;

impl EvictionStrategy for LruEviction {
    fn select(&self, candidates: Vec<Candidate>, to_evict: usize) -> Vec<String> {
        oldest_first(candidates, to_evict)
    }
}

impl EvictionStrategy for FifoEviction {
    fn select(&self, candidates: Vec<Candidate>, to_evict: usize) -> Vec<String> {
        oldest_first(candidates, to_evict)
    }
}

impl EvictionStrategy for LfuEviction {
    fn select(&self, mut candidates: Vec<Candidate>, to_evict: usize) -> Vec<String> {
        candidates.sort_by_key(|c| (c.hits, c.seq));
        take_keys(candidates, to_evict)
    }
}

impl EvictionStrategy for RandomEviction {
    fn select(&self, mut candidates: Vec<Candidate>, to_evict: usize) -> Vec<String> {
        candidates.shuffle(&mut rand::rng());
        take_keys(candidates, to_evict)
    }
}

fn oldest_first(mut candidates: Vec<Candidate>, to_evict: usize) -> Vec<String> {
    candidates.sort_by_key(|c| (c.created_at, c.seq));
    take_keys(candidates, to_evict)
}

fn take_keys(candidates: Vec<Candidate>, to_evict: usize) -> Vec<String> {
    candidates
        .into_iter()
        .take(to_evict)
        .map(|c| c.key)
        .collect()
}

impl EvictionPolicy {
    /// Strategy implementing this policy.
    pub fn strategy(&self) -> &'static dyn EvictionStrategy {
        match self {
            EvictionPolicy::Lru => &LruEviction,
            EvictionPolicy::Lfu => &LfuEviction,
            EvictionPolicy::Fifo => &FifoEviction,
            EvictionPolicy::Random => &RandomEviction,
        }
    }
}

// == Select Victims ==
/// Chooses the keys to evict so `namespace` holds at most `max_items`.
///
/// `hits` holds the namespace's per-key hit counts; keys missing from it
/// count as never hit. Returns an empty list when within bounds.
pub fn select_victims(
    policy: EvictionPolicy,
    namespace: &Namespace,
    hits: &HashMap<&str, u64>,
    max_items: usize,
) -> Vec<String> {
    let count = namespace.len();
    if count <= max_items {
        return Vec::new();
    }
    let to_evict = count - max_items;

    let candidates = namespace
        .items_with_seq()
        .map(|(item, seq)| Candidate {
            key: item.key().to_string(),
            created_at: item.created_at(),
            seq,
            hits: hits.get(item.key()).copied().unwrap_or(0),
        })
        .collect();

    policy.strategy().select(candidates, to_evict)
}
