//! Main configuration types.
//!
//! This module provides the top-level [`HermesConfig`] struct and its builder.

use std::collections::BTreeMap;

use hermes_authz::{RbacEnforcer, RbacPolicyConfig};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, HooksConfig, LogFormat, ServerConfig, TelemetryConfigSection};

/// Complete hook server configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:9992");
/// assert_eq!(config.hooks.max_recursion_depth, 16);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Hook dispatch configuration.
    #[serde(default)]
    pub hooks: HooksConfig,

    /// Telemetry configuration (metrics, logging).
    #[serde(default)]
    pub telemetry: TelemetryConfigSection,

    /// RBAC policies for proxy hooks, keyed by proxy name.
    #[serde(default)]
    pub proxies: BTreeMap<String, RbacPolicyConfig>,
}

impl HermesConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> HermesConfigBuilder {
        HermesConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The server address is not a socket address
    /// - The request timeout or recursion depth is zero
    /// - The gateway URL is not an http(s) URL
    /// - The log level is not a valid filter directive
    /// - Metrics are enabled without histogram buckets
    /// - A proxy policy contains a blank role
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.hooks.max_recursion_depth == 0 {
            return Err(ConfigError::invalid_value(
                "hooks.max_recursion_depth",
                "must be at least 1",
            ));
        }

        let gateway = self.hooks.gateway_url.as_str();
        if !(gateway.starts_with("http://") || gateway.starts_with("https://")) {
            return Err(ConfigError::invalid_value(
                "hooks.gateway_url",
                format!("expected an http(s) URL: {gateway}"),
            ));
        }

        if self.telemetry.logging.enabled
            && hermes_telemetry::create_env_filter(&self.telemetry.logging.level).is_err()
        {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                format!("invalid filter directive: {}", self.telemetry.logging.level),
            ));
        }

        if self.telemetry.metrics.enabled && self.telemetry.metrics.histogram_buckets.is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.histogram_buckets",
                "at least one bucket is required",
            ));
        }

        for (name, policy) in &self.proxies {
            policy.validate(name)?;
        }

        Ok(())
    }

    /// Builds the enforcer configured for proxy `name`.
    ///
    /// Returns `Ok(None)` when the proxy has no configured policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Policy` if the policy is invalid.
    pub fn proxy_policy(&self, name: &str) -> Result<Option<RbacEnforcer>, ConfigError> {
        self.proxies
            .get(name)
            .map(|policy| policy.build(name))
            .transpose()
            .map_err(ConfigError::from)
    }

    /// Development preset: pretty debug logs with location info.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::HermesConfig;
    ///
    /// let config = HermesConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.ansi_enabled = true;
        config.telemetry.logging.include_location = true;
        config.telemetry.environment = "development".to_string();

        config
    }

    /// Production preset: JSON logs at info level and metrics enabled.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::{HermesConfig, LogFormat};
    ///
    /// let config = HermesConfig::production();
    /// assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    /// assert!(config.telemetry.metrics.enabled);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.logging.ansi_enabled = false;
        config.telemetry.environment = "production".to_string();
        config.telemetry.metrics.enabled = true;

        config
    }
}

/// Builder for [`HermesConfig`].
#[derive(Debug, Default)]
pub struct HermesConfigBuilder {
    server: Option<ServerConfig>,
    hooks: Option<HooksConfig>,
    telemetry: Option<TelemetryConfigSection>,
    proxies: BTreeMap<String, RbacPolicyConfig>,
}

impl HermesConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server configuration.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the hook dispatch configuration.
    #[must_use]
    pub fn hooks(mut self, hooks: HooksConfig) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Set the telemetry configuration.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfigSection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Add a proxy policy.
    #[must_use]
    pub fn proxy(mut self, name: impl Into<String>, policy: RbacPolicyConfig) -> Self {
        self.proxies.insert(name.into(), policy);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> HermesConfig {
        HermesConfig {
            server: self.server.unwrap_or_default(),
            hooks: self.hooks.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
            proxies: self.proxies,
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<HermesConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
