//! Prometheus metrics for region nodes.
//!
//! All metrics follow the naming convention: `rr_<component>_<metric>_<unit>`
//! and carry a `region` label so several regions can share one process.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // COMMAND METRICS (rr-04)
    // =========================================================================

    /// Commands by outcome
    pub static ref COMMANDS: CounterVec = CounterVec::new(
        Opts::new("rr_commands_total", "Commands handled by outcome"),
        &["region", "outcome"]  // committed/duplicate/conflict/store_failure/replication_pending
    ).expect("metric creation failed");

    /// Command latency
    pub static ref COMMAND_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "rr_command_duration_seconds",
            "Time spent handling a command"
        ).buckets(exponential_buckets(0.0001, 2.0, 15).expect("valid buckets")),
        &["region"]
    ).expect("metric creation failed");

    /// Tracked idempotency markers
    pub static ref IDEMPOTENCY_MARKERS: GaugeVec = GaugeVec::new(
        Opts::new("rr_idempotency_markers", "Request ids tracked by the idempotency guard"),
        &["region"]
    ).expect("metric creation failed");

    // =========================================================================
    // REPLICATION METRICS (rr-03)
    // =========================================================================

    /// Inbound replication events by outcome
    pub static ref REPLICATION_EVENTS: CounterVec = CounterVec::new(
        Opts::new("rr_replication_events_total", "Inbound replication events by outcome"),
        &["region", "outcome"]  // applied/duplicate/stale/self_origin/poisoned/store_failure
    ).expect("metric creation failed");

    /// Reconnect attempts by the coordinator
    pub static ref COORDINATOR_RECONNECTS: CounterVec = CounterVec::new(
        Opts::new("rr_coordinator_reconnects_total", "Event log connection attempts after a failure"),
        &["region"]
    ).expect("metric creation failed");

    /// Replication lag
    pub static ref REPLICATION_LAG: GaugeVec = GaugeVec::new(
        Opts::new("rr_replication_lag_seconds", "Age of the most recently applied remote write"),
        &["region"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Commands
        Box::new(COMMANDS.clone()),
        Box::new(COMMAND_DURATION.clone()),
        Box::new(IDEMPOTENCY_MARKERS.clone()),
        // Replication
        Box::new(REPLICATION_EVENTS.clone()),
        Box::new(COORDINATOR_RECONNECTS.clone()),
        Box::new(REPLICATION_LAG.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
