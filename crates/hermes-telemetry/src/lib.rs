//! Observability for Hermes hook servers.
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output
//! - **Metrics**: Prometheus exposition via the `metrics` facade
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_hook_requests_total` | Counter | `kind`, `hook`, `status` | Hook invocations |
//! | `hermes_hook_duration_seconds` | Histogram | `kind` | Hook latency |
//! | `hermes_rbac_decisions_total` | Counter | `result` | Proxy hook RBAC outcomes |
//! | `hermes_recursion_rejections_total` | Counter | - | Recursion guard rejections |
//! | `hermes_in_flight_requests` | Gauge | - | Requests being handled |
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::{init_telemetry, MetricsConfig, TelemetryConfig};
//!
//! let config = TelemetryConfig::for_service("billing-hooks")
//!     .with_metrics(MetricsConfig { enabled: true, ..MetricsConfig::default() });
//! init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};
pub use metrics::{
    default_duration_buckets, init_metrics, record_hook_request, record_rbac_decision,
    record_recursion_rejection, render_metrics, InFlightGuard, MetricsConfig,
};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
