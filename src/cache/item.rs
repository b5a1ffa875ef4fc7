//! Cache Item Module
//!
//! Defines the immutable value holder stored in a namespace.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Free-form metadata attached to an item.
pub type Metadata = serde_json::Map<String, Value>;

// == Cache Item ==
/// A single cached value with creation/expiry timestamps and metadata.
///
/// Items are never mutated; a TTL update produces a new item through
/// [`CacheItem::with_ttl`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheItem {
    key: String,
    value: Value,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    metadata: Metadata,
}

impl CacheItem {
    // == Constructor ==
    /// Creates a new item with optional TTL.
    ///
    /// # Arguments
    /// * `key` - The key the item is stored under
    /// * `value` - The opaque value
    /// * `ttl_seconds` - Optional TTL in seconds, `None` = never expires
    /// * `metadata` - Caller-supplied metadata
    pub fn new(
        key: impl Into<String>,
        value: Value,
        ttl_seconds: Option<u64>,
        metadata: Metadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            value,
            created_at: now,
            expires_at: ttl_seconds.map(|ttl| expiry_from(now, ttl)),
            metadata,
        }
    }

    /// Rebuilds an item from persisted parts, keeping the original `created_at`.
    ///
    /// An `expires_at` earlier than `created_at` is clamped up to it.
    pub fn restore(
        key: impl Into<String>,
        value: Value,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        metadata: Metadata,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            created_at,
            expires_at: expires_at.map(|at| at.max(created_at)),
            metadata,
        }
    }

    // == With TTL ==
    /// Returns a copy of this item with a new expiry measured from now.
    pub fn with_ttl(&self, ttl_seconds: Option<u64>) -> Self {
        let now = Utc::now().max(self.created_at);
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            created_at: self.created_at,
            expires_at: ttl_seconds.map(|ttl| expiry_from(now, ttl)),
            metadata: self.metadata.clone(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    // == Is Expired ==
    /// Checks if the item has expired.
    ///
    /// An item is expired once the current time is greater than or equal to
    /// its expiration time. Items without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Expiry check against an explicit instant, used by sweeps and saves
    /// so one pass sees a single "now".
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

fn expiry_from(now: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
    let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
    Duration::try_seconds(ttl)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
