//! # Hermes
//!
//! Hook middleware for API gateways.
//!
//! A gateway calls Hermes over HTTP at well-known points of a request:
//! before and after an operation resolves, before a proxied upstream call,
//! and around file uploads. Hermes decodes the payload, runs the resolver
//! registered for that hook, normalizes the JSON it sends back and replies.
//!
//! ## Crates
//!
//! - [`core`] - Hook payloads, context, errors and the recursion guard
//! - [`json`] - Zero-value restore, zero-time stripping and `dataAny` promotion
//! - [`authz`] - Role-based access control for proxy hooks
//! - [`config`] - Layered configuration (defaults, files, environment)
//! - [`telemetry`] - Logging and Prometheus metrics
//! - [`server`] - Hook registry and HTTP server
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hermes::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hermes::StartupError> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("hermes.toml")?
//!         .with_env_prefix("HERMES")
//!         .load()?;
//!
//!     let mut registry = HookRegistry::new();
//!     registry.register_operation_hook(
//!         "Users/Update",
//!         MiddlewareHook::MutatingPreResolve,
//!         |_req, body: OperationBody<Json, Json>| async move {
//!             Ok::<_, HookError>(Some(body))
//!         },
//!     );
//!
//!     hermes::serve(&config, registry).await
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use hermes_config::{ConfigError, HermesConfig};
use hermes_server::{HookRegistry, ServerBuilder, ServerError, ShutdownSignal};
use hermes_telemetry::TelemetryError;

pub use hermes_authz as authz;
pub use hermes_config as config;
pub use hermes_core as core;
pub use hermes_json as json;
pub use hermes_server as server;
pub use hermes_telemetry as telemetry;

/// Common imports for hook servers.
///
/// ```rust
/// use hermes::prelude::*;
///
/// let registry = HookRegistry::new();
/// assert!(registry.is_empty());
/// ```
pub mod prelude {
    pub use hermes_authz::{RbacEnforcer, RbacPolicyConfig};
    pub use hermes_config::{ConfigLoader, HermesConfig};
    pub use hermes_core::{
        ClientRequest, ClientResponse, HookContext, HookError, HookResult, Json, MiddlewareHook,
        OperationBody, ProxyHookBody, UploadBody, UploadHook, UploadHookResponse, User,
    };
    pub use hermes_json::Normalizer;
    pub use hermes_server::{
        HookRegistry, HookRequest, InternalClient, Server, ServerBuilder, ShutdownSignal,
    };
}

/// Anything that keeps a hook server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The server failed to bind or serve.
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Installs telemetry from `config` and serves `registry` until SIGTERM or SIGINT.
///
/// # Errors
///
/// Returns [`StartupError`] if telemetry cannot be installed, the
/// configuration is invalid or the listener cannot be bound.
pub async fn serve(config: &HermesConfig, registry: HookRegistry) -> Result<(), StartupError> {
    serve_with_shutdown(config, registry, ShutdownSignal::with_os_signals()).await
}

/// Like [`serve`], but stops when `shutdown` is triggered.
///
/// # Errors
///
/// See [`serve`].
pub async fn serve_with_shutdown(
    config: &HermesConfig,
    registry: HookRegistry,
    shutdown: ShutdownSignal,
) -> Result<(), StartupError> {
    hermes_telemetry::init_telemetry(&config.telemetry.to_telemetry_config())?;

    let server = ServerBuilder::from_config(config)?.registry(registry).build();
    tracing::info!(
        service = %config.telemetry.service_name,
        environment = %config.telemetry.environment,
        hooks = server.router().route_count(),
        "Starting hook server"
    );
    server.run_with_shutdown(shutdown).await?;
    Ok(())
}
