//! Runtime telemetry settings for one hook server.
//!
//! The service name is stamped on every log line and used as the metrics
//! `service` label, so it lives here once and is copied into both
//! subsystems whenever it or a subsystem changes.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// Logging and metrics settings of a hook server.
///
/// ```rust
/// use hermes_telemetry::{MetricsConfig, TelemetryConfig};
///
/// let config = TelemetryConfig::for_service("billing-hooks")
///     .in_environment("production")
///     .with_metrics(MetricsConfig { enabled: true, ..MetricsConfig::default() });
///
/// assert_eq!(config.metrics.service_name, "billing-hooks");
/// assert_eq!(config.logging.service_name, "billing-hooks");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Name the gateway operators know this hook server by.
    pub service_name: String,
    /// Deployment environment, e.g. `production`.
    pub environment: String,
    /// Prometheus recorder settings.
    pub metrics: MetricsConfig,
    /// Subscriber settings.
    pub logging: LogConfig,
}

impl TelemetryConfig {
    /// Defaults for `service`, with metrics off and logging on.
    #[must_use]
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service_name: String::new(),
            environment: "development".to_string(),
            metrics: MetricsConfig::default(),
            logging: LogConfig::default(),
        }
        .renamed(service.into())
    }

    /// Sets the deployment environment.
    #[must_use]
    pub fn in_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Replaces the metrics settings, keeping the service name.
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        let name = std::mem::take(&mut self.service_name);
        self.renamed(name)
    }

    /// Replaces the logging settings, keeping the service name.
    #[must_use]
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        let name = std::mem::take(&mut self.service_name);
        self.renamed(name)
    }

    fn renamed(mut self, service: String) -> Self {
        self.metrics.service_name.clone_from(&service);
        self.logging.service_name.clone_from(&service);
        self.service_name = service;
        self
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::for_service("hermes-hooks")
    }
}
