//! Liveness endpoint.
//!
//! `GET /health` answers as long as the process accepts connections. The
//! gateway polls it before sending the first hook call.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `"ok"` while the server is up.
    pub status: String,
    /// Service name from the telemetry config.
    pub service: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the server was built.
    pub uptime_seconds: u64,
    /// Number of registered hook routes.
    pub hooks: usize,
}

/// Produces [`HealthStatus`] snapshots.
///
/// ```rust
/// use hermes_server::HealthCheck;
///
/// let health = HealthCheck::new("hermes-hooks", "0.1.0");
/// let status = health.status(3);
/// assert_eq!(status.status, "ok");
/// assert_eq!(status.hooks, 3);
/// ```
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    started_at: Instant,
}

impl HealthCheck {
    /// Starts the uptime clock.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            started_at: Instant::now(),
        }
    }

    /// Service name reported by the endpoint.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Current status.
    #[must_use]
    pub fn status(&self, hooks: usize) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            service: self.service.clone(),
            version: self.version.clone(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            hooks,
        }
    }
}
