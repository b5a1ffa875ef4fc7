//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check hit/miss accounting, size bounds, namespace
//! isolation and eviction order against the `CacheManager` facade.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use tokio_test::block_on;

use crate::cache::{CacheManager, SetOptions, ALL_NAMESPACES, DEFAULT_NAMESPACE};
use crate::config::{CacheConfig, EvictionPolicy};

// == Test Configuration ==
const TEST_MAX_ITEMS: usize = 100;

fn test_cache(max_items: usize, eviction_policy: EvictionPolicy) -> CacheManager {
    CacheManager::new(CacheConfig {
        max_items,
        eviction_policy,
        ..CacheConfig::default()
    })
}

// == Strategies ==
/// Generates cache keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:]{1,32}".prop_map(|s| s)
}

/// Generates opaque JSON values
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,64}".prop_map(|s| json!(s)),
        any::<bool>().prop_map(|b| json!({ "flag": b })),
    ]
}

fn policy_strategy() -> impl Strategy<Value = EvictionPolicy> {
    prop_oneof![
        Just(EvictionPolicy::Lru),
        Just(EvictionPolicy::Lfu),
        Just(EvictionPolicy::Fifo),
        Just(EvictionPolicy::Random),
    ]
}

/// A sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Has { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Has { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Hits and misses reported by stats match what `get` observed; `has`
    // never moves the counters.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let cache = test_cache(TEST_MAX_ITEMS, EvictionPolicy::Lru);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        block_on(async {
            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        cache.set(&key, value).await;
                    }
                    CacheOp::Get { key } => match cache.get(&key, DEFAULT_NAMESPACE).await {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    },
                    CacheOp::Has { key } => {
                        cache.has(&key, DEFAULT_NAMESPACE).await;
                    }
                    CacheOp::Delete { key } => {
                        cache.delete(&key, DEFAULT_NAMESPACE).await;
                    }
                }
            }
        });

        let stats = block_on(cache.stats(ALL_NAMESPACES));
        prop_assert_eq!(stats.total_hits(), expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.total_misses(), expected_misses, "Misses mismatch");
    }

    // A stored value reads back unchanged before expiry.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in value_strategy()) {
        let cache = test_cache(TEST_MAX_ITEMS, EvictionPolicy::Lru);

        let retrieved = block_on(async {
            cache.set(&key, value.clone()).await;
            cache.get(&key, DEFAULT_NAMESPACE).await
        });
        prop_assert_eq!(retrieved, Some(value), "Round-trip value mismatch");
    }

    // No policy ever lets a namespace grow past max_items.
    #[test]
    fn prop_capacity_enforcement(
        policy in policy_strategy(),
        keys in prop::collection::vec(valid_key_strategy(), 1..120)
    ) {
        let max_items = 20;
        let cache = test_cache(max_items, policy);

        block_on(async {
            for key in &keys {
                cache.set(key, json!(key)).await;
                let items = cache.stats(DEFAULT_NAMESPACE).await.namespaces[DEFAULT_NAMESPACE].items;
                prop_assert!(items <= max_items, "Namespace size {} exceeds max {}", items, max_items);
            }
            Ok(())
        })?;
    }

    // Writes to one namespace never show up in another.
    #[test]
    fn prop_namespace_isolation(
        key in valid_key_strategy(),
        left in value_strategy(),
        right in value_strategy()
    ) {
        let cache = test_cache(TEST_MAX_ITEMS, EvictionPolicy::Lru);

        let (from_x, from_y, deleted_x, still_y) = block_on(async {
            cache.set_with(&key, left.clone(), SetOptions::new().namespace("x")).await;
            cache.set_with(&key, right.clone(), SetOptions::new().namespace("y")).await;
            let from_x = cache.get(&key, "x").await;
            let from_y = cache.get(&key, "y").await;
            let deleted_x = cache.delete(&key, "x").await;
            let still_y = cache.has(&key, "y").await;
            (from_x, from_y, deleted_x, still_y)
        });

        prop_assert_eq!(from_x, Some(left));
        prop_assert_eq!(from_y, Some(right));
        prop_assert!(deleted_x);
        prop_assert!(still_y, "Deleting in x must not touch y");
    }

    // FIFO keeps exactly the newest max_items distinct keys.
    #[test]
    fn prop_fifo_evicts_oldest(keys in prop::collection::vec(valid_key_strategy(), 2..60)) {
        let mut seen = HashSet::new();
        let unique: Vec<String> = keys.into_iter().filter(|k| seen.insert(k.clone())).collect();
        prop_assume!(unique.len() >= 2);

        let max_items = unique.len() / 2;
        prop_assume!(max_items >= 1);
        let cache = test_cache(max_items, EvictionPolicy::Fifo);

        block_on(async {
            for key in &unique {
                cache.set(key, json!(key)).await;
            }

            let cutoff = unique.len() - max_items;
            for (i, key) in unique.iter().enumerate() {
                let present = cache.has(key, DEFAULT_NAMESPACE).await;
                prop_assert_eq!(present, i >= cutoff, "Unexpected presence for key '{}'", key);
            }
            Ok(())
        })?;
    }
}
