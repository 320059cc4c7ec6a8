//! Prometheus metrics for the pulse node.
//!
//! The [`NodeMetrics`] struct owns a dedicated [`Registry`] that a metrics
//! endpoint can encode into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Total frames proven locally.
    pub frames_proved: IntCounter,
    /// Total frames accepted from peers via sync.
    pub frames_synced: IntCounter,
    /// Total sync sessions that ended in an error.
    pub sync_errors: IntCounter,
    /// Total transaction requests staged.
    pub transactions_staged: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Current head frame number.
    pub head_frame_number: IntGauge,
    /// Cooperative peers currently tracked.
    pub cooperative_peers: IntGauge,
    /// Uncooperative peers currently tracked.
    pub uncooperative_peers: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time of a full proving round, in milliseconds.
    pub prove_duration_ms: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let frames_proved = register_int_counter_with_registry!(
            Opts::new("pulse_frames_proved_total", "Total frames proven locally"),
            registry
        )
        .expect("failed to register frames_proved counter");

        let frames_synced = register_int_counter_with_registry!(
            Opts::new(
                "pulse_frames_synced_total",
                "Total frames accepted from peers via sync"
            ),
            registry
        )
        .expect("failed to register frames_synced counter");

        let sync_errors = register_int_counter_with_registry!(
            Opts::new(
                "pulse_sync_errors_total",
                "Total sync sessions that ended in an error"
            ),
            registry
        )
        .expect("failed to register sync_errors counter");

        let transactions_staged = register_int_counter_with_registry!(
            Opts::new(
                "pulse_transactions_staged_total",
                "Total transaction requests staged"
            ),
            registry
        )
        .expect("failed to register transactions_staged counter");

        let head_frame_number = register_int_gauge_with_registry!(
            Opts::new("pulse_head_frame_number", "Current head frame number"),
            registry
        )
        .expect("failed to register head_frame_number gauge");

        let cooperative_peers = register_int_gauge_with_registry!(
            Opts::new(
                "pulse_cooperative_peers",
                "Cooperative peers currently tracked"
            ),
            registry
        )
        .expect("failed to register cooperative_peers gauge");

        let uncooperative_peers = register_int_gauge_with_registry!(
            Opts::new(
                "pulse_uncooperative_peers",
                "Uncooperative peers currently tracked"
            ),
            registry
        )
        .expect("failed to register uncooperative_peers gauge");

        // Proving rounds span milliseconds to minutes depending on
        // difficulty; exponential buckets cover 1 ms → ~2 min.
        let prove_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "pulse_prove_duration_ms",
                "Wall time of a full proving round in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 17).unwrap()),
            registry
        )
        .expect("failed to register prove_duration_ms histogram");

        Self {
            registry,
            frames_proved,
            frames_synced,
            sync_errors,
            transactions_staged,
            head_frame_number,
            cooperative_peers,
            uncooperative_peers,
            prove_duration_ms,
        }
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
