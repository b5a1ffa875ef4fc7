//! Namespace Module
//!
//! A namespace maps keys to cache items and is the unit of isolation,
//! iteration, and bulk clearing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::cache::CacheItem;

#[derive(Debug, Clone)]
struct Slot {
    item: CacheItem,
    /// Insertion sequence, breaks `created_at` ties
    seq: u64,
}

// == Namespace ==
/// Key-to-item mapping for a single namespace.
#[derive(Debug, Default, Clone)]
pub struct Namespace {
    slots: HashMap<String, Slot>,
    next_seq: u64,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Inserts or overwrites an item, returning the previous one.
    pub fn insert(&mut self, item: CacheItem) -> Option<CacheItem> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots
            .insert(item.key().to_string(), Slot { item, seq })
            .map(|slot| slot.item)
    }

    /// Replaces an existing item in place, keeping its insertion position.
    ///
    /// Returns false when the key is absent.
    pub fn replace(&mut self, item: CacheItem) -> bool {
        match self.slots.get_mut(item.key()) {
            Some(slot) => {
                slot.item = item;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheItem> {
        self.slots.get(key).map(|slot| &slot.item)
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheItem> {
        self.slots.remove(key).map(|slot| slot.item)
    }

    /// Empties the namespace, returning how many items were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.slots.len();
        self.slots.clear();
        count
    }

    // == Remove Expired ==
    /// Removes every item expired at `now` and returns their keys.
    pub fn remove_expired(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let expired: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.item.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.slots.remove(key);
        }
        expired
    }

    /// Number of items that have expired but are still stored.
    pub fn expired_count(&self, now: DateTime<Utc>) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.item.is_expired_at(now))
            .count()
    }

    /// Iterates items in unspecified order.
    pub fn items(&self) -> impl Iterator<Item = &CacheItem> {
        self.slots.values().map(|slot| &slot.item)
    }

    /// Iterates items with their insertion sequence numbers.
    pub(crate) fn items_with_seq(&self) -> impl Iterator<Item = (&CacheItem, u64)> {
        self.slots.values().map(|slot| (&slot.item, slot.seq))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
