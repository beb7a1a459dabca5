//! Failures while wiring up logging and metrics.

use thiserror::Error;

/// Why telemetry could not be installed.
///
/// All of these happen once at startup; none can occur while hooks run.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive did not parse.
    #[error("bad log filter: {0}")]
    Filter(String),

    /// A global tracing subscriber was already set.
    #[error("cannot install log subscriber: {0}")]
    Subscriber(String),

    /// The hook duration buckets were rejected.
    #[error("bad histogram buckets: {0}")]
    Buckets(String),

    /// A global metrics recorder was already set.
    #[error("cannot install metrics recorder: {0}")]
    Recorder(String),
}
