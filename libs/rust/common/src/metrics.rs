//! Minimal Prometheus-text metrics helpers.
//!
//! Not wired to a scrape endpoint here (no HTTP server is in scope for the
//! engine); a host embedding this crate decides how to surface
//! `to_prometheus()` output.

use std::sync::atomic::{AtomicU64, Ordering};

/// A simple monotonically increasing counter.
#[derive(Debug)]
pub struct Counter {
    name: String,
    help: String,
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value: AtomicU64::new(0),
        }
    }

    /// Increment the counter by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Format as Prometheus text exposition.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {} {}\n# TYPE {} counter\n{} {}\n",
            self.name,
            self.help,
            self.name,
            self.name,
            self.get()
        )
    }
}

/// A simple settable gauge.
#[derive(Debug)]
pub struct Gauge {
    name: String,
    help: String,
    value: AtomicU64,
}

impl Gauge {
    /// Create a new gauge.
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value: AtomicU64::new(0),
        }
    }

    /// Set the gauge value.
    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Increment the gauge by one.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement the gauge by one, saturating at zero.
    pub fn dec(&self) {
        let _ = self
            .value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }

    /// Get the current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Format as Prometheus text exposition.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {} {}\n# TYPE {} gauge\n{} {}\n",
            self.name,
            self.help,
            self.name,
            self.name,
            self.get()
        )
    }
}

/// Hits, misses, and current size for a single named cache.
#[derive(Debug)]
pub struct CacheMetrics {
    /// Cache hits.
    pub hits: Counter,
    /// Cache misses.
    pub misses: Counter,
    /// Current number of entries held by the cache.
    pub size: Gauge,
}

impl CacheMetrics {
    /// Construct cache metrics with the given metric name prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            hits: Counter::new(format!("{prefix}_cache_hits_total"), "Total number of cache hits"),
            misses: Counter::new(
                format!("{prefix}_cache_misses_total"),
                "Total number of cache misses",
            ),
            size: Gauge::new(
                format!("{prefix}_cache_size"),
                "Current number of items in cache",
            ),
        }
    }

    /// Record a cache hit.
    pub fn record_hit(&self) {
        self.hits.inc();
    }

    /// Record a cache miss.
    pub fn record_miss(&self) {
        self.misses.inc();
    }

    /// Update the current cache size.
    pub fn update_size(&self, size: u64) {
        self.size.set(size);
    }

    /// Format all three metrics as Prometheus text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "{}{}{}",
            self.hits.to_prometheus(),
            self.misses.to_prometheus(),
            self.size.to_prometheus()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new("exchanges_total", "Total exchanges");
        counter.inc();
        counter.inc();
        assert_eq!(counter.get(), 2);
        assert!(counter.to_prometheus().contains("exchanges_total 2"));
    }

    #[test]
    fn test_gauge() {
        let gauge = Gauge::new("cached_keys", "Currently cached keys");
        gauge.set(3);
        assert_eq!(gauge.get(), 3);
    }

    #[test]
    fn test_gauge_inc_dec() {
        let gauge = Gauge::new("signing_keys", "Currently registered signing keys");
        gauge.inc();
        gauge.inc();
        assert_eq!(gauge.get(), 2);
        gauge.dec();
        assert_eq!(gauge.get(), 1);
    }

    #[test]
    fn test_gauge_dec_saturates_at_zero() {
        let gauge = Gauge::new("signing_keys", "Currently registered signing keys");
        gauge.dec();
        assert_eq!(gauge.get(), 0);
    }

    #[test]
    fn test_cache_metrics_records_hits_and_misses() {
        let cache = CacheMetrics::new("jwks");
        cache.record_hit();
        cache.record_hit();
        cache.record_miss();
        cache.update_size(5);

        assert_eq!(cache.hits.get(), 2);
        assert_eq!(cache.misses.get(), 1);
        assert_eq!(cache.size.get(), 5);

        let rendered = cache.to_prometheus();
        assert!(rendered.contains("jwks_cache_hits_total 2"));
        assert!(rendered.contains("jwks_cache_misses_total 1"));
        assert!(rendered.contains("jwks_cache_size 5"));
    }
}
