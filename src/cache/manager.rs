//! Cache Manager Module
//!
//! The public facade. Orchestrates namespaces, eviction, counters, metrics,
//! write-through persistence and the background reclamation task.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, error, info, warn};

use crate::cache::{
    select_victims, CacheCounters, CacheItem, EvictionReason, Metadata, Namespace,
    NamespaceStats, StatsReport,
};
use crate::config::{CacheConfig, CacheType};
use crate::error::{CacheError, Result};
use crate::metrics::{
    InMemoryMetrics, MetricsSink, CACHE_CLEANUP_SECONDS, CACHE_EVICTIONS_TOTAL, CACHE_HITS_TOTAL,
    CACHE_ITEMS, CACHE_MISSES_TOTAL,
};
use crate::persistence::DiskStore;
use crate::tasks::{spawn_reclamation_task, ReclamationHandle, SweepReport};

/// Namespace used when callers do not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Passing this to [`CacheManager::stats`] reports every namespace.
pub const ALL_NAMESPACES: &str = "all";

// == TTL Choice ==
/// How long a `set` keeps its item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ttl {
    /// Use the configured `default_ttl_seconds`
    #[default]
    Default,
    /// Never expire
    Never,
    /// Expire after this many seconds
    Seconds(u64),
}

// == Set Options ==
/// Optional arguments of [`CacheManager::set_with`].
#[derive(Debug, Clone)]
pub struct SetOptions {
    pub namespace: String,
    pub ttl: Ttl,
    pub metadata: Metadata,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl: Ttl::Default,
            metadata: Metadata::new(),
        }
    }
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl_seconds(self, seconds: u64) -> Self {
        self.ttl(Ttl::Seconds(seconds))
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Default)]
struct CacheState {
    namespaces: HashMap<String, Namespace>,
    counters: CacheCounters,
}

enum Lookup {
    Hit(Value),
    Expired,
    Missing,
}

pub(crate) struct CacheInner {
    config: CacheConfig,
    enabled: AtomicBool,
    state: RwLock<CacheState>,
    disk: Option<DiskStore>,
    metrics: Arc<dyn MetricsSink>,
    initialized: OnceCell<()>,
    reclaimer: parking_lot::Mutex<Option<ReclamationHandle>>,
}

// == Cache Manager ==
/// Namespaced key-value cache with TTL, eviction and optional persistence.
///
/// Cloning is cheap; clones share the same cache. All namespaces and
/// counters sit behind one lock shared by callers and the reclamation task.
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<CacheInner>,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a cache reporting to a fresh [`InMemoryMetrics`].
    pub fn new(config: CacheConfig) -> Self {
        Self::with_metrics(config, Arc::new(InMemoryMetrics::new()))
    }

    /// Creates a cache reporting to the given metrics sink.
    ///
    /// Nothing is loaded or spawned until [`initialize`](Self::initialize)
    /// or the first operation.
    pub fn with_metrics(config: CacheConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        if config.cache_type == CacheType::Distributed {
            warn!(
                servers = ?config.distributed_servers,
                "Distributed cache is not implemented, running in memory"
            );
        }

        let disk = config
            .is_persistent()
            .then(|| DiskStore::new(config.persistent_path.clone()));

        Self {
            inner: Arc::new(CacheInner {
                enabled: AtomicBool::new(config.enabled),
                config,
                state: RwLock::new(CacheState::default()),
                disk,
                metrics,
                initialized: OnceCell::new(),
                reclaimer: parking_lot::Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn downgrade(&self) -> Weak<CacheInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_weak(weak: &Weak<CacheInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    // == Initialize ==
    /// Loads persisted state, registers configured namespaces and starts the
    /// reclamation task. Runs once; later calls return immediately.
    pub async fn initialize(&self) -> Result<()> {
        self.inner
            .initialized
            .get_or_try_init(|| self.load_and_start())
            .await?;
        Ok(())
    }

    async fn ensure_initialized(&self) {
        if let Err(err) = self.initialize().await {
            error!(error = %err, "Cache initialization failed, continuing in memory");
        }
    }

    async fn load_and_start(&self) -> Result<()> {
        let mut state = self.inner.state.write().await;

        if let Some(disk) = &self.inner.disk {
            let loaded = disk
                .load_all(Utc::now())
                .await
                .map_err(|err| CacheError::internal("loading persisted cache", err))?;

            let mut restored = 0;
            for (name, items) in loaded {
                let namespace = state.namespaces.entry(name).or_default();
                for item in items {
                    namespace.insert(item);
                    restored += 1;
                }
            }
            info!(
                items = restored,
                path = %disk.root().display(),
                "Loaded persisted cache"
            );
        }

        for name in &self.inner.config.namespaces {
            state.namespaces.entry(name.clone()).or_default();
        }

        // A smaller max_items than the saved cache was written with
        let names: Vec<String> = state.namespaces.keys().cloned().collect();
        for name in &names {
            let victims = self.size_limit_victims(&state, name);
            if !victims.is_empty() {
                let evicted = self.evict(&mut state, name, &victims, EvictionReason::SizeLimit);
                self.delete_from_disk(name, &evicted).await;
            }
            self.update_item_gauge(&state, name);
        }
        drop(state);

        if self.is_enabled() {
            self.start_reclamation();
        }
        Ok(())
    }

    // == Set ==
    /// Stores `value` under `key` in the default namespace with the default TTL.
    pub async fn set(&self, key: &str, value: Value) -> Value {
        self.set_with(key, value, SetOptions::default()).await
    }

    /// Stores `value` under `key` and returns it.
    ///
    /// Overwrites any existing item, writes through to disk in persistent
    /// mode and evicts if the namespace grows past `max_items`. A disabled
    /// cache returns `value` without storing it.
    pub async fn set_with(&self, key: &str, value: Value, options: SetOptions) -> Value {
        if !self.is_enabled() {
            return value;
        }
        self.ensure_initialized().await;

        let ttl = match options.ttl {
            Ttl::Default => self.inner.config.default_ttl_seconds,
            Ttl::Never => None,
            Ttl::Seconds(seconds) => Some(seconds),
        };
        let namespace = options.namespace;
        let item = CacheItem::new(key, value.clone(), ttl, options.metadata);

        let mut state = self.inner.state.write().await;
        if let Some(disk) = &self.inner.disk {
            if let Err(err) = disk.save_item(&namespace, &item).await {
                warn!(namespace = %namespace, key = %key, error = %err, "Failed to persist cache item");
            }
        }
        state
            .namespaces
            .entry(namespace.clone())
            .or_default()
            .insert(item);

        let victims = self.size_limit_victims(&state, &namespace);
        if !victims.is_empty() {
            let evicted = self.evict(&mut state, &namespace, &victims, EvictionReason::SizeLimit);
            self.delete_from_disk(&namespace, &evicted).await;
        }
        self.update_item_gauge(&state, &namespace);

        value
    }

    // == Get ==
    /// Returns the live value for `key`, recording a hit or miss.
    ///
    /// An expired item is removed and counted as an `expired` eviction.
    pub async fn get(&self, key: &str, namespace: &str) -> Option<Value> {
        if !self.is_enabled() {
            return None;
        }
        self.ensure_initialized().await;

        let mut state = self.inner.state.write().await;
        let lookup = match state.namespaces.get(namespace).and_then(|ns| ns.get(key)) {
            Some(item) if item.is_expired() => Lookup::Expired,
            Some(item) => Lookup::Hit(item.value().clone()),
            None => Lookup::Missing,
        };

        match lookup {
            Lookup::Hit(value) => {
                state.counters.record_hit(namespace, key);
                self.inner
                    .metrics
                    .increment_counter(CACHE_HITS_TOTAL, &[("namespace", namespace)], 1);
                Some(value)
            }
            Lookup::Expired => {
                let keys = [key.to_string()];
                let evicted = self.evict(&mut state, namespace, &keys, EvictionReason::Expired);
                self.delete_from_disk(namespace, &evicted).await;
                self.update_item_gauge(&state, namespace);
                self.record_miss(&mut state, namespace, key);
                None
            }
            Lookup::Missing => {
                self.record_miss(&mut state, namespace, key);
                None
            }
        }
    }

    /// Like [`get`](Self::get) but falls back to `default`.
    pub async fn get_or(&self, key: &str, namespace: &str, default: Value) -> Value {
        self.get(key, namespace).await.unwrap_or(default)
    }

    // == Has ==
    /// True when `key` holds a live item.
    ///
    /// Expired items read as absent but are left for `get` or the next
    /// sweep to remove. Hit/miss counters are not touched.
    pub async fn has(&self, key: &str, namespace: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.ensure_initialized().await;

        let state = self.inner.state.read().await;
        state
            .namespaces
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .is_some_and(|item| !item.is_expired())
    }

    // == Delete ==
    /// Removes `key`; returns whether an item was removed from memory.
    pub async fn delete(&self, key: &str, namespace: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.ensure_initialized().await;

        let mut state = self.inner.state.write().await;
        let removed = state
            .namespaces
            .get_mut(namespace)
            .and_then(|ns| ns.remove(key))
            .is_some();

        self.delete_from_disk(namespace, &[key.to_string()]).await;
        if removed {
            self.update_item_gauge(&state, namespace);
        }
        removed
    }

    // == Clear ==
    /// Empties a namespace; returns whether it existed.
    pub async fn clear(&self, namespace: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.ensure_initialized().await;

        let mut state = self.inner.state.write().await;
        let Some(cleared) = state.namespaces.get_mut(namespace).map(Namespace::clear) else {
            return false;
        };

        self.record_evictions(&mut state, namespace, EvictionReason::Clear, cleared);
        if let Some(disk) = &self.inner.disk {
            if let Err(err) = disk.clear_namespace(namespace).await {
                warn!(namespace = %namespace, error = %err, "Failed to clear persisted namespace");
            }
        }
        self.record_item_gauge(namespace, 0);
        debug!(namespace = %namespace, items = cleared, "Cleared namespace");
        true
    }

    // == Set TTL ==
    /// Gives a live item a new expiry measured from now (`None` = never).
    ///
    /// Returns false without changing anything if the key is absent or
    /// already expired.
    pub async fn set_ttl(&self, key: &str, ttl_seconds: Option<u64>, namespace: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.ensure_initialized().await;

        let mut state = self.inner.state.write().await;
        let Some(ns) = state.namespaces.get_mut(namespace) else {
            return false;
        };
        let updated = match ns.get(key) {
            Some(item) if !item.is_expired() => item.with_ttl(ttl_seconds),
            _ => return false,
        };
        ns.replace(updated.clone());

        if let Some(disk) = &self.inner.disk {
            if let Err(err) = disk.save_item(namespace, &updated).await {
                warn!(namespace = %namespace, key = %key, error = %err, "Failed to persist TTL update");
            }
        }
        true
    }

    // == Stats ==
    /// Config snapshot plus statistics for `namespace`, or for every
    /// namespace when given [`ALL_NAMESPACES`].
    pub async fn stats(&self, namespace: &str) -> StatsReport {
        self.ensure_initialized().await;

        let state = self.inner.state.read().await;
        let mut report = StatsReport::new(&self.inner.config, self.is_enabled());

        let names: BTreeSet<String> = if namespace == ALL_NAMESPACES {
            state
                .namespaces
                .keys()
                .chain(state.counters.namespaces())
                .cloned()
                .collect()
        } else {
            BTreeSet::from([namespace.to_string()])
        };

        let now = Utc::now();
        for name in names {
            let (items, expired) = state
                .namespaces
                .get(&name)
                .map_or((0, 0), |ns| (ns.len(), ns.expired_count(now)));
            let (hits, misses) = state.counters.namespace_totals(&name);
            let evictions = state.counters.evictions_for(&name);
            report.namespaces.insert(
                name,
                NamespaceStats::new(items, expired, hits, misses, evictions),
            );
        }
        report
    }

    // == Sweep ==
    /// Runs one reclamation sweep now.
    pub async fn sweep(&self) -> SweepReport {
        self.ensure_initialized().await;
        self.reclaim().await
    }

    /// Removes expired items, enforces `max_items` on every namespace and,
    /// in persistent mode, saves the whole cache.
    pub(crate) async fn reclaim(&self) -> SweepReport {
        let started = Instant::now();
        let now = Utc::now();
        let mut report = SweepReport::default();

        let mut state = self.inner.state.write().await;
        let names: Vec<String> = state.namespaces.keys().cloned().collect();

        for name in &names {
            let expired = state
                .namespaces
                .get_mut(name)
                .map(|ns| ns.remove_expired(now))
                .unwrap_or_default();
            self.record_evictions(&mut state, name, EvictionReason::Expired, expired.len());
            report.expired += expired.len();

            let victims = self.size_limit_victims(&state, name);
            report.evicted += self
                .evict(&mut state, name, &victims, EvictionReason::SizeLimit)
                .len();

            self.update_item_gauge(&state, name);
        }

        if let Some(disk) = &self.inner.disk {
            report.persisted_namespaces = disk.save_all(&state.namespaces, now).await;
        }
        drop(state);

        report.duration = started.elapsed();
        self.inner.metrics.observe_histogram(
            CACHE_CLEANUP_SECONDS,
            &[],
            report.duration.as_secs_f64(),
        );
        report
    }

    // == Disable / Shutdown ==
    /// Stops serving and storing; the reclamation task is stopped and joined.
    pub async fn disable(&self) {
        self.inner.enabled.store(false, Ordering::Relaxed);
        self.stop_reclamation().await;
        info!("Cache disabled");
    }

    /// Stops the reclamation task and, in persistent mode, saves the cache.
    pub async fn shutdown(&self) {
        self.stop_reclamation().await;

        if let Some(disk) = &self.inner.disk {
            if self.inner.initialized.initialized() && self.is_enabled() {
                let state = self.inner.state.read().await;
                let saved = disk.save_all(&state.namespaces, Utc::now()).await;
                info!(namespaces = saved, "Persisted cache on shutdown");
            }
        }
    }

    fn start_reclamation(&self) {
        let mut slot = self.inner.reclaimer.lock();
        if slot.is_none() {
            *slot = Some(spawn_reclamation_task(
                self,
                self.inner.config.cleanup_interval(),
            ));
        }
    }

    async fn stop_reclamation(&self) {
        let handle = self.inner.reclaimer.lock().take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }

    // == Internal Helpers ==
    fn size_limit_victims(&self, state: &CacheState, namespace: &str) -> Vec<String> {
        let Some(ns) = state.namespaces.get(namespace) else {
            return Vec::new();
        };
        let hits = state.counters.namespace_hits(namespace);
        select_victims(
            self.inner.config.eviction_policy,
            ns,
            &hits,
            self.inner.config.max_items,
        )
    }

    /// Removes `keys` from memory, records them as evictions and returns
    /// the keys that were actually present.
    fn evict(
        &self,
        state: &mut CacheState,
        namespace: &str,
        keys: &[String],
        reason: EvictionReason,
    ) -> Vec<String> {
        let evicted: Vec<String> = match state.namespaces.get_mut(namespace) {
            Some(ns) => keys
                .iter()
                .filter(|key| ns.remove(key).is_some())
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        self.record_evictions(state, namespace, reason, evicted.len());
        if !evicted.is_empty() {
            debug!(namespace = %namespace, reason = %reason, count = evicted.len(), "Evicted items");
        }
        evicted
    }

    async fn delete_from_disk(&self, namespace: &str, keys: &[String]) {
        let Some(disk) = &self.inner.disk else {
            return;
        };
        for key in keys {
            if let Err(err) = disk.delete_item(namespace, key).await {
                warn!(namespace = %namespace, key = %key, error = %err, "Failed to delete persisted item");
            }
        }
    }

    fn record_miss(&self, state: &mut CacheState, namespace: &str, key: &str) {
        state.counters.record_miss(namespace, key);
        self.inner
            .metrics
            .increment_counter(CACHE_MISSES_TOTAL, &[("namespace", namespace)], 1);
    }

    fn record_evictions(
        &self,
        state: &mut CacheState,
        namespace: &str,
        reason: EvictionReason,
        count: usize,
    ) {
        if count == 0 {
            return;
        }
        state
            .counters
            .record_evictions(namespace, reason, count as u64);
        self.inner.metrics.increment_counter(
            CACHE_EVICTIONS_TOTAL,
            &[("namespace", namespace), ("reason", reason.as_str())],
            count as u64,
        );
    }

    fn update_item_gauge(&self, state: &CacheState, namespace: &str) {
        let len = state.namespaces.get(namespace).map_or(0, Namespace::len);
        self.record_item_gauge(namespace, len);
    }

    fn record_item_gauge(&self, namespace: &str, len: usize) {
        self.inner
            .metrics
            .set_gauge(CACHE_ITEMS, &[("namespace", namespace)], len as f64);
    }
}
