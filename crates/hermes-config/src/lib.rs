//! Typed configuration for Hermes hook servers.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides (`HERMES__SECTION__KEY`)
//! - Strict parsing: unknown fields are errors
//! - Layered loading (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use hermes_config::ConfigLoader;
//!
//! # fn main() -> Result<(), hermes_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("hermes.toml")?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//!
//! println!("Hook server will listen on: {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:9992"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//!
//! [hooks]
//! max_recursion_depth = 16
//! gateway_url = "http://localhost:9991"
//!
//! [telemetry]
//! service_name = "billing-hooks"
//! environment = "production"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//!
//! [proxies.stripe]
//! auth_required = true
//! require_match_any = ["billing", "admin"]
//! deny_match_any = ["suspended"]
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{HermesConfig, HermesConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    HooksConfig, LogFormat, LoggingConfig, MetricsConfig, ServerConfig, TelemetryConfigSection,
};
