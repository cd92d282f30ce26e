//! # Metrics Collection Module
//!
//! Prometheus export for the generation path plus a small JSON stats view.
//!
//! ## Endpoints
//!
//! - `GET /metrics` - Prometheus text format metrics
//! - `GET /stats` - JSON format statistics
//!
//! ## Metrics Tracked
//!
//! **Counters:**
//! - `memocha_llm_requests_total{outcome}` - Generation calls by outcome (success, empty, error)
//! - `memocha_llm_errors_total{kind}` - Failed generation calls by taxonomy kind
//! - `memocha_llm_retries_total{kind}` - Retry waits by the kind that triggered them
//! - `memocha_circuit_transitions_total{to}` - Breaker transitions by target state
//!
//! **Histograms:**
//! - `memocha_llm_request_duration_seconds` - End-to-end generation latency, retries included
//!
//! **Gauges:**
//! - `memocha_circuit_state` - 0 closed, 1 half-open, 2 open
//!
//! All recording helpers go through the global `metrics` recorder. Without an
//! installed recorder they are no-ops, so library users and unit tests pay nothing.

pub mod handler;
pub mod types;

pub use types::StatsResponse;

// Re-exported so callers can build a detached handle when a recorder is already installed
pub use metrics_exporter_prometheus::PrometheusBuilder;

use metrics_exporter_prometheus::PrometheusHandle;
use std::time::{Duration, Instant};

pub const LLM_REQUESTS_TOTAL: &str = "memocha_llm_requests_total";
pub const LLM_ERRORS_TOTAL: &str = "memocha_llm_errors_total";
pub const LLM_RETRIES_TOTAL: &str = "memocha_llm_retries_total";
pub const LLM_REQUEST_DURATION: &str = "memocha_llm_request_duration_seconds";
pub const CIRCUIT_TRANSITIONS_TOTAL: &str = "memocha_circuit_transitions_total";
pub const CIRCUIT_STATE: &str = "memocha_circuit_state";

/// Owns the Prometheus handle and the process start time.
pub struct MetricsCollector {
    start_time: Instant,
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(start_time: Instant, prometheus_handle: PrometheusHandle) -> Self {
        Self {
            start_time,
            prometheus_handle,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Render Prometheus metrics in text format.
    pub fn render_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("start_time", &self.start_time)
            .finish_non_exhaustive()
    }
}

/// Initialize the Prometheus exporter as the global recorder.
///
/// Buckets follow chat-completion latency (seconds): a cached short reply lands
/// well under a second, a long generation with retries can take a minute.
pub fn setup_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    let duration_buckets = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(LLM_REQUEST_DURATION.to_string()),
            duration_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Record a finished generation call.
pub fn record_llm_request(outcome: &'static str, elapsed: Duration) {
    metrics::counter!(LLM_REQUESTS_TOTAL, "outcome" => outcome).increment(1);
    metrics::histogram!(LLM_REQUEST_DURATION).record(elapsed.as_secs_f64());
}

pub fn record_llm_error(kind: &'static str) {
    metrics::counter!(LLM_ERRORS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_retry(kind: &'static str) {
    metrics::counter!(LLM_RETRIES_TOTAL, "kind" => kind).increment(1);
}

/// Record a breaker transition and publish the new state as a gauge.
pub fn record_circuit_transition(to: &'static str, gauge: f64) {
    metrics::counter!(CIRCUIT_TRANSITIONS_TOTAL, "to" => to).increment(1);
    metrics::gauge!(CIRCUIT_STATE).set(gauge);
}
