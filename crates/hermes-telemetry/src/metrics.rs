//! Prometheus metrics for hook dispatch.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `hermes_hook_requests_total` | Counter | `kind`, `hook`, `status` |
//! | `hermes_hook_duration_seconds` | Histogram | `kind` |
//! | `hermes_rbac_decisions_total` | Counter | `result` |
//! | `hermes_recursion_rejections_total` | Counter | - |
//! | `hermes_in_flight_requests` | Gauge | - |
//!
//! The recording functions go through the `metrics` facade and are no-ops
//! until [`init_metrics`] installs a recorder.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

const HOOK_REQUESTS: &str = "hermes_hook_requests_total";
const HOOK_DURATION: &str = "hermes_hook_duration_seconds";
const RBAC_DECISIONS: &str = "hermes_rbac_decisions_total";
const RECURSION_REJECTIONS: &str = "hermes_recursion_rejections_total";
const IN_FLIGHT: &str = "hermes_in_flight_requests";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether a Prometheus recorder is installed.
    pub enabled: bool,

    /// Service name for logs emitted during setup.
    pub service_name: String,

    /// Buckets for `hermes_hook_duration_seconds`.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "hermes".to_string(),
            duration_buckets: default_duration_buckets(),
        }
    }
}

/// 1ms to 10s.
#[must_use]
pub fn default_duration_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

/// Installs the global Prometheus recorder.
///
/// Only the first successful call installs anything. Once installed,
/// [`render_metrics`] returns the exposition text.
///
/// # Errors
///
/// Returns [`TelemetryError::Buckets`] for an empty bucket list and
/// [`TelemetryError::Recorder`] if a different recorder is already set.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled || METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(HOOK_DURATION.to_string()), &config.duration_buckets)
        .map_err(|e| TelemetryError::Buckets(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::Recorder(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    tracing::debug!(service = %config.service_name, "Prometheus recorder installed");
    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(HOOK_REQUESTS, "Hook invocations by kind, hook and status");
    describe_histogram!(HOOK_DURATION, "Hook handling duration in seconds");
    describe_counter!(RBAC_DECISIONS, "Proxy hook RBAC decisions by result");
    describe_counter!(
        RECURSION_REJECTIONS,
        "Operation hooks rejected by the recursion guard"
    );
    describe_gauge!(IN_FLIGHT, "Hook requests currently being handled");
}

/// Records one handled hook request.
///
/// `kind` is `operation`, `proxy`, `upload` or `health`; `hook` is the hook
/// name within that kind.
pub fn record_hook_request(kind: &str, hook: &str, status_code: u16, duration: Duration) {
    counter!(
        HOOK_REQUESTS,
        "kind" => kind.to_string(),
        "hook" => hook.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(HOOK_DURATION, "kind" => kind.to_string()).record(duration.as_secs_f64());
}

/// Records an RBAC decision.
pub fn record_rbac_decision(allowed: bool) {
    let result = if allowed { "allow" } else { "deny" };
    counter!(RBAC_DECISIONS, "result" => result).increment(1);
}

/// Records a recursion guard rejection.
pub fn record_recursion_rejection() {
    counter!(RECURSION_REJECTIONS).increment(1);
}

/// Keeps `hermes_in_flight_requests` raised while alive.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT).decrement(1.0);
    }
}
