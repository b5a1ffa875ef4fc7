//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from
//! environment variables.

use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::DEFAULT_NAMESPACE;

// == Eviction Policy ==
/// Strategy used to pick victims when a namespace exceeds `max_items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    Lru,
    Lfu,
    Fifo,
    Random,
}

impl EvictionPolicy {
    /// Parses a policy name, falling back to `Random` for unknown input.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "lru" => EvictionPolicy::Lru,
            "lfu" => EvictionPolicy::Lfu,
            "fifo" => EvictionPolicy::Fifo,
            "random" => EvictionPolicy::Random,
            other => {
                warn!(policy = %other, "Unknown eviction policy, falling back to random");
                EvictionPolicy::Random
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Lfu => "lfu",
            EvictionPolicy::Fifo => "fifo",
            EvictionPolicy::Random => "random",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Cache Type ==
/// Storage mode of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    Memory,
    Persistent,
    /// Accepted for compatibility; behaves as `Memory`.
    Distributed,
}

impl CacheType {
    /// Parses a cache type, falling back to `Memory` for unknown input.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "memory" => CacheType::Memory,
            "persistent" => CacheType::Persistent,
            "distributed" => CacheType::Distributed,
            other => {
                warn!(cache_type = %other, "Unknown cache type, falling back to memory");
                CacheType::Memory
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheType::Memory => "memory",
            CacheType::Persistent => "persistent",
            CacheType::Distributed => "distributed",
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Cache Config ==
/// Process-wide cache settings.
///
/// Constructed once and read-mostly afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether the cache stores anything at all
    pub enabled: bool,
    /// TTL applied when a caller does not pick one; `None` = never expire
    pub default_ttl_seconds: Option<u64>,
    /// Per-namespace item bound
    pub max_items: usize,
    pub eviction_policy: EvictionPolicy,
    pub cache_type: CacheType,
    /// Root directory for persistent mode
    pub persistent_path: PathBuf,
    /// Namespaces registered at startup
    pub namespaces: BTreeSet<String>,
    /// Accepted but not used
    pub distributed_servers: Vec<String>,
    /// Seconds between reclamation sweeps
    pub cleanup_interval_secs: u64,
}

impl CacheConfig {
    /// Loads cache settings from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENABLED` - Enable the cache (default: true)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: none)
    /// - `CACHE_MAX_ITEMS` - Per-namespace item bound (default: 1000)
    /// - `CACHE_EVICTION_POLICY` - lru, lfu, fifo or random (default: lru)
    /// - `CACHE_TYPE` - memory, persistent or distributed (default: memory)
    /// - `CACHE_PERSISTENT_PATH` - Persistence root (default: ./cache_data)
    /// - `CACHE_NAMESPACES` - Comma-separated namespace names (default: default)
    /// - `CACHE_DISTRIBUTED_SERVERS` - Comma-separated server list (ignored)
    /// - `CACHE_CLEANUP_INTERVAL` - Sweep interval in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_ttl_seconds = match env::var("CACHE_DEFAULT_TTL") {
            Ok(raw) => parse_optional_ttl(&raw),
            Err(_) => defaults.default_ttl_seconds,
        };

        let mut namespaces = env::var("CACHE_NAMESPACES")
            .map(|v| split_list(&v).into_iter().collect::<BTreeSet<_>>())
            .unwrap_or(defaults.namespaces);
        namespaces.insert(DEFAULT_NAMESPACE.to_string());

        Self {
            enabled: env_parse("CACHE_ENABLED").unwrap_or(defaults.enabled),
            default_ttl_seconds,
            max_items: env_parse("CACHE_MAX_ITEMS").unwrap_or(defaults.max_items),
            eviction_policy: env::var("CACHE_EVICTION_POLICY")
                .map(|v| EvictionPolicy::parse(&v))
                .unwrap_or(defaults.eviction_policy),
            cache_type: env::var("CACHE_TYPE")
                .map(|v| CacheType::parse(&v))
                .unwrap_or(defaults.cache_type),
            persistent_path: env::var("CACHE_PERSISTENT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.persistent_path),
            namespaces,
            distributed_servers: env::var("CACHE_DISTRIBUTED_SERVERS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.distributed_servers),
            cleanup_interval_secs: env_parse("CACHE_CLEANUP_INTERVAL")
                .unwrap_or(defaults.cleanup_interval_secs),
        }
    }

    /// True when write-through persistence should run.
    pub fn is_persistent(&self) -> bool {
        self.cache_type == CacheType::Persistent
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_seconds: None,
            max_items: 1000,
            eviction_policy: EvictionPolicy::Lru,
            cache_type: CacheType::Memory,
            persistent_path: PathBuf::from("./cache_data"),
            namespaces: BTreeSet::from([DEFAULT_NAMESPACE.to_string()]),
            distributed_servers: Vec::new(),
            cleanup_interval_secs: 60,
        }
    }
}

// == Server Config ==
/// Top-level configuration for the cache server binary.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    pub cache: CacheConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// `SERVER_PORT` sets the HTTP port (default: 3000); see
    /// [`CacheConfig::from_env`] for the cache variables.
    pub fn from_env() -> Self {
        Self {
            server_port: env_parse("SERVER_PORT").unwrap_or(3000),
            cache: CacheConfig::from_env(),
        }
    }
}

// == Helpers ==
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_optional_ttl(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        return None;
    }
    match raw.parse() {
        Ok(ttl) => Some(ttl),
        Err(_) => {
            warn!(value = %raw, "Invalid CACHE_DEFAULT_TTL, using no default TTL");
            None
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
