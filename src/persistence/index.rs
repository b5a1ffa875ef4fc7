//! Index Document Module
//!
//! The per-namespace `index.json` document and the mapping from namespace
//! and key names to file-system path components.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheItem, Metadata};

/// Index document: key -> entry.
pub type NamespaceIndex = BTreeMap<String, IndexEntry>;

// == Index Entry ==
/// Everything about an item except its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl IndexEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }
}

impl From<&CacheItem> for IndexEntry {
    fn from(item: &CacheItem) -> Self {
        Self {
            created_at: item.created_at(),
            expires_at: item.expires_at(),
            metadata: item.metadata().clone(),
        }
    }
}

// == Path Encoding ==
/// Longest component written as plain [`encode_component`] output; longer
/// names are hashed by [`path_component`].
pub const MAX_COMPONENT_LEN: usize = 200;

/// Encoded bytes kept in front of the digest of a hashed component.
const HASHED_PREFIX_LEN: usize = 64;

/// Separates prefix and digest. Never produced by [`encode_component`].
const HASHED_SEPARATOR: char = '~';

/// Maps a namespace or key to the file-system component it is stored under.
///
/// Names whose encoding fits [`MAX_COMPONENT_LEN`] use it unchanged. Longer
/// ones become an encoded prefix, `~` and the blake3 digest of the full
/// name, so the result always fits a file name.
pub fn path_component(name: &str) -> String {
    let encoded = encode_component(name);
    if encoded.len() <= MAX_COMPONENT_LEN {
        return encoded;
    }
    let digest = blake3::hash(name.as_bytes());
    format!(
        "{}{}{}",
        &encoded[..HASHED_PREFIX_LEN],
        HASHED_SEPARATOR,
        digest.to_hex()
    )
}

/// True for components [`path_component`] produced by hashing; their name
/// cannot be decoded back.
pub fn is_hashed_component(component: &str) -> bool {
    component.contains(HASHED_SEPARATOR)
}

/// Encodes a namespace or key as a single path component.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX`. A `.` passes through unless it leads the name. The empty name
/// encodes to `%`.
pub fn encode_component(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }
    let mut out = String::with_capacity(name.len());
    for (i, byte) in name.bytes().enumerate() {
        let passthrough =
            byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || (byte == b'.' && i > 0);
        if passthrough {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Reverses [`encode_component`]; `None` for names it could not have produced.
pub fn decode_component(encoded: &str) -> Option<String> {
    if encoded == "%" {
        return Some(String::new());
    }
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else if bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'-' | b'_' | b'.') {
            out.push(bytes[i]);
            i += 1;
        } else {
            return None;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_encode_safe_names_unchanged() {
        assert_eq!(encode_component("default"), "default");
        assert_eq!(encode_component("user_1-a.b"), "user_1-a.b");
    }

    #[test]
    fn test_encode_unsafe_bytes() {
        assert_eq!(encode_component("user:1"), "user%3A1");
        assert_eq!(encode_component("a/b"), "a%2Fb");
        assert_eq!(encode_component(".."), "%2E.");
        assert_eq!(encode_component(""), "%");
    }

    #[test]
    fn test_decode_reverses_encode() {
        for name in ["user:1", "a/b c", "..", "", "ключ", "100%"] {
            assert_eq!(decode_component(&encode_component(name)).as_deref(), Some(name));
        }
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(decode_component("bad%2"), None);
        assert_eq!(decode_component("bad%zz"), None);
        assert_eq!(decode_component("prefix~abc"), None);
    }

    #[test]
    fn test_path_component_short_names_are_encoded() {
        assert_eq!(path_component("user:1"), "user%3A1");
        let exact = "k".repeat(MAX_COMPONENT_LEN);
        assert_eq!(path_component(&exact), exact);
        assert!(!is_hashed_component(&exact));
    }

    #[test]
    fn test_path_component_long_names_are_hashed() {
        let long = "k".repeat(256);
        let component = path_component(&long);
        assert!(is_hashed_component(&component));
        assert!(component.len() <= MAX_COMPONENT_LEN);
        assert!(component.starts_with(&"k".repeat(HASHED_PREFIX_LEN)));
        assert_eq!(component, path_component(&long));

        // Same prefix, different tail
        let other = format!("{}x", "k".repeat(255));
        assert_ne!(component, path_component(&other));

        // Multibyte names triple in length once encoded
        let wide = "ключ".repeat(30);
        let component = path_component(&wide);
        assert!(is_hashed_component(&component));
        assert!(component.len() <= MAX_COMPONENT_LEN);
    }

    #[test]
    fn test_index_entry_json_shape() {
        let created = Utc::now();
        let entry = IndexEntry {
            created_at: created,
            expires_at: None,
            metadata: Metadata::new(),
        };
        let value = serde_json::to_value(&entry).unwrap();

        assert!(value["created_at"].is_string());
        assert!(value["expires_at"].is_null());
        assert_eq!(value["metadata"], json!({}));
    }

    #[test]
    fn test_index_entry_expiry() {
        let now = Utc::now();
        let entry = IndexEntry {
            created_at: now,
            expires_at: Some(now + Duration::seconds(1)),
            metadata: Metadata::new(),
        };
        assert!(!entry.is_expired_at(now));
        assert!(entry.is_expired_at(now + Duration::seconds(1)));
    }
}
