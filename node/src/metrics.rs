//! Prometheus metrics for the dirchain node.
//!
//! The [`NodeMetrics`] struct owns a dedicated [`Registry`] so several nodes
//! can run in one process (tests) without colliding in the default registry.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Messages written to the journal.
    pub messages_journaled: IntCounter,
    /// Messages appended to a process list.
    pub messages_processed: IntCounter,
    /// Messages rejected by signature or authority checks.
    pub verification_failures: IntCounter,
    /// Messages dropped as stale (below the replay watermark or a sealed height).
    pub messages_dropped: IntCounter,
    /// Heights sealed and persisted.
    pub blocks_sealed: IntCounter,
    /// Seal or persist attempts that failed and were left for retry.
    pub seal_failures: IntCounter,
    /// Diagnostic records written to the journal.
    pub diagnostics: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Height currently being built.
    pub current_height: IntGauge,
    /// Messages waiting in the ack and message queues.
    pub pending_messages: IntGauge,
    /// Size of the federated server set for the current height.
    pub fed_servers: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent assembling and persisting one height, in milliseconds.
    pub seal_time_ms: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let messages_journaled = register_int_counter_with_registry!(
            Opts::new(
                "dirchain_messages_journaled_total",
                "Messages written to the journal"
            ),
            registry
        )
        .expect("failed to register messages_journaled counter");

        let messages_processed = register_int_counter_with_registry!(
            Opts::new(
                "dirchain_messages_processed_total",
                "Messages appended to a process list"
            ),
            registry
        )
        .expect("failed to register messages_processed counter");

        let verification_failures = register_int_counter_with_registry!(
            Opts::new(
                "dirchain_verification_failures_total",
                "Messages rejected by signature or authority checks"
            ),
            registry
        )
        .expect("failed to register verification_failures counter");

        let messages_dropped = register_int_counter_with_registry!(
            Opts::new("dirchain_messages_dropped_total", "Stale messages dropped"),
            registry
        )
        .expect("failed to register messages_dropped counter");

        let blocks_sealed = register_int_counter_with_registry!(
            Opts::new("dirchain_blocks_sealed_total", "Heights sealed and persisted"),
            registry
        )
        .expect("failed to register blocks_sealed counter");

        let seal_failures = register_int_counter_with_registry!(
            Opts::new(
                "dirchain_seal_failures_total",
                "Seal or persist attempts that failed"
            ),
            registry
        )
        .expect("failed to register seal_failures counter");

        let diagnostics = register_int_counter_with_registry!(
            Opts::new(
                "dirchain_diagnostics_total",
                "Diagnostic records written to the journal"
            ),
            registry
        )
        .expect("failed to register diagnostics counter");

        let current_height = register_int_gauge_with_registry!(
            Opts::new("dirchain_current_height", "Height currently being built"),
            registry
        )
        .expect("failed to register current_height gauge");

        let pending_messages = register_int_gauge_with_registry!(
            Opts::new(
                "dirchain_pending_messages",
                "Messages waiting in the validator queues"
            ),
            registry
        )
        .expect("failed to register pending_messages gauge");

        let fed_servers = register_int_gauge_with_registry!(
            Opts::new("dirchain_fed_servers", "Federated servers at the current height"),
            registry
        )
        .expect("failed to register fed_servers gauge");

        let seal_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "dirchain_seal_time_ms",
                "Time to assemble and persist one height in milliseconds"
            )
            .buckets(vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]),
            registry
        )
        .expect("failed to register seal_time_ms histogram");

        Self {
            registry,
            messages_journaled,
            messages_processed,
            verification_failures,
            messages_dropped,
            blocks_sealed,
            seal_failures,
            diagnostics,
            current_height,
            pending_messages,
            fed_servers,
            seal_time_ms,
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let metrics = NodeMetrics::new();
        metrics.blocks_sealed.inc();
        metrics.current_height.set(7);
        let text = metrics.encode_text();
        assert!(text.contains("dirchain_blocks_sealed_total 1"));
        assert!(text.contains("dirchain_current_height 7"));
    }
}
