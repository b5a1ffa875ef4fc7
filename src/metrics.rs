//! Metrics Module
//!
//! The narrow interface the cache emits counters, gauges and histogram
//! samples through, plus an in-memory registry that can render them in the
//! Prometheus text format.

use std::collections::BTreeMap;
use std::fmt::Write;

use parking_lot::Mutex;

/// Counter: hits per namespace.
pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
/// Counter: misses per namespace.
pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
/// Counter: evictions per namespace and reason.
pub const CACHE_EVICTIONS_TOTAL: &str = "cache_evictions_total";
/// Gauge: items stored per namespace.
pub const CACHE_ITEMS: &str = "cache_items";
/// Histogram: reclamation sweep duration in seconds.
pub const CACHE_CLEANUP_SECONDS: &str = "cache_cleanup_seconds";

/// Upper bounds of the histogram buckets, in seconds.
pub const HISTOGRAM_BUCKETS: [f64; 10] = [0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0];

/// Label pairs attached to a sample.
pub type Labels<'a> = &'a [(&'static str, &'a str)];

// == Metrics Sink ==
/// Destination for cache metrics.
pub trait MetricsSink: Send + Sync {
    fn increment_counter(&self, name: &'static str, labels: Labels<'_>, value: u64);
    fn set_gauge(&self, name: &'static str, labels: Labels<'_>, value: f64);
    fn observe_histogram(&self, name: &'static str, labels: Labels<'_>, value: f64);
}

type SeriesKey = (&'static str, Vec<(&'static str, String)>);

fn series_key(name: &'static str, labels: Labels<'_>) -> SeriesKey {
    let mut labels: Vec<(&'static str, String)> = labels
        .iter()
        .map(|(k, v)| (*k, (*v).to_string()))
        .collect();
    labels.sort();
    (name, labels)
}

// == Histogram ==
/// Fixed-size histogram: per-bucket counts plus total count and sum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    /// Samples per bucket of [`HISTOGRAM_BUCKETS`]; samples above the last
    /// bound only reach `count`
    pub buckets: [u64; HISTOGRAM_BUCKETS.len()],
    pub count: u64,
    pub sum: f64,
}

impl Histogram {
    fn observe(&mut self, value: f64) {
        if let Some(slot) = HISTOGRAM_BUCKETS.iter().position(|bound| value <= *bound) {
            self.buckets[slot] += 1;
        }
        self.count += 1;
        self.sum += value;
    }
}

#[derive(Debug, Default)]
struct Registry {
    counters: BTreeMap<SeriesKey, u64>,
    gauges: BTreeMap<SeriesKey, f64>,
    histograms: BTreeMap<SeriesKey, Histogram>,
}

// == In-Memory Metrics ==
/// Thread-safe registry holding every emitted sample in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    registry: Mutex<Registry>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter series, zero if never incremented.
    pub fn counter(&self, name: &'static str, labels: Labels<'_>) -> u64 {
        self.registry
            .lock()
            .counters
            .get(&series_key(name, labels))
            .copied()
            .unwrap_or(0)
    }

    pub fn gauge(&self, name: &'static str, labels: Labels<'_>) -> Option<f64> {
        self.registry
            .lock()
            .gauges
            .get(&series_key(name, labels))
            .copied()
    }

    /// Snapshot of a histogram series, empty if never observed.
    pub fn histogram(&self, name: &'static str, labels: Labels<'_>) -> Histogram {
        self.registry
            .lock()
            .histograms
            .get(&series_key(name, labels))
            .cloned()
            .unwrap_or_default()
    }

    // == Render ==
    /// Renders all series in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let registry = self.registry.lock();
        let mut out = String::new();

        for ((name, labels), value) in &registry.counters {
            let _ = writeln!(out, "{}{} {}", name, format_labels(labels), value);
        }
        for ((name, labels), value) in &registry.gauges {
            let _ = writeln!(out, "{}{} {}", name, format_labels(labels), value);
        }
        for ((name, labels), histogram) in &registry.histograms {
            let mut cumulative = 0;
            for (bound, count) in HISTOGRAM_BUCKETS.iter().zip(histogram.buckets) {
                cumulative += count;
                let mut bucket_labels = labels.clone();
                bucket_labels.push(("le", bound.to_string()));
                let _ = writeln!(out, "{}_bucket{} {}", name, format_labels(&bucket_labels), cumulative);
            }
            let mut inf_labels = labels.clone();
            inf_labels.push(("le", "+Inf".to_string()));
            let _ = writeln!(out, "{}_bucket{} {}", name, format_labels(&inf_labels), histogram.count);

            let labels = format_labels(labels);
            let _ = writeln!(out, "{}_count{} {}", name, labels, histogram.count);
            let _ = writeln!(out, "{}_sum{} {}", name, labels, histogram.sum);
        }
        out
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment_counter(&self, name: &'static str, labels: Labels<'_>, value: u64) {
        *self
            .registry
            .lock()
            .counters
            .entry(series_key(name, labels))
            .or_insert(0) += value;
    }

    fn set_gauge(&self, name: &'static str, labels: Labels<'_>, value: f64) {
        self.registry
            .lock()
            .gauges
            .insert(series_key(name, labels), value);
    }

    fn observe_histogram(&self, name: &'static str, labels: Labels<'_>, value: f64) {
        self.registry
            .lock()
            .histograms
            .entry(series_key(name, labels))
            .or_default()
            .observe(value);
    }
}

fn format_labels(labels: &[(&'static str, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let body: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{{{}}}", body.join(","))
}
