//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{Metadata, SetOptions, Ttl};

/// Maximum accepted key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for `PUT /cache/:namespace/:key`
///
/// # Fields
/// - `value`: The value to store, any JSON
/// - `ttl`: Optional TTL in seconds; `null` means never expire, absent
///   means the configured default
/// - `metadata`: Optional metadata object
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub value: Value,
    #[serde(default, deserialize_with = "deserialize_ttl")]
    pub ttl: Ttl,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SetRequest {
    /// Builds the `set_with` options for this request.
    pub fn options(&self, namespace: &str) -> SetOptions {
        SetOptions::new()
            .namespace(namespace)
            .ttl(self.ttl)
            .metadata(self.metadata.clone())
    }
}

/// Request body for `PUT /cache/:namespace/:key/ttl`
///
/// `ttl: null` (or an absent field) removes the expiry.
#[derive(Debug, Clone, Deserialize)]
pub struct TtlRequest {
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Validates a key from the request path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}

// A present field is either a number or null; an absent field stays Default.
fn deserialize_ttl<'de, D>(deserializer: D) -> Result<Ttl, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let ttl: Option<u64> = Option::deserialize(deserializer)?;
    Ok(match ttl {
        Some(seconds) => Ttl::Seconds(seconds),
        None => Ttl::Never,
    })
}
