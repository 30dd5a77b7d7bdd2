//! Engine metrics, built from `delegation-common`'s Prometheus-style
//! primitives. Not wired to an HTTP scrape endpoint — no server is in scope
//! — but exposed as plain text a host can surface however it sees fit.

use delegation_common::Counter;

/// Counters tracked directly by the engine's admin surface.
///
/// JWKS cache hit/miss/size metrics live on [`crate::jwks::JwksClient`]
/// itself (`cache_metrics()`), and the signing-key count lives on
/// [`crate::keystore::KeyStore`] (`keys_gauge()`) — both are recorded at
/// their actual call sites rather than duplicated here. [`Engine::metrics_snapshot`](crate::admin::Engine::metrics_snapshot)
/// merges all three into one Prometheus text body.
pub struct EngineMetrics {
    /// Total successful exchanges.
    pub exchanges_total: Counter,
    /// Total exchange failures, of any error kind.
    pub exchange_errors_total: Counter,
    /// Total key rotations performed.
    pub key_rotations_total: Counter,
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Construct a fresh, zeroed metrics set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            exchanges_total: Counter::new("exchanges_total", "Total successful exchanges"),
            exchange_errors_total: Counter::new("exchange_errors_total", "Total exchange failures"),
            key_rotations_total: Counter::new("key_rotations_total", "Total key rotations"),
        }
    }

    /// Render this struct's own metrics in Prometheus text exposition format.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        [
            self.exchanges_total.to_prometheus(),
            self.exchange_errors_total.to_prometheus(),
            self.key_rotations_total.to_prometheus(),
        ]
        .join("\n")
    }
}
