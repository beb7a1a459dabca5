//! Server lifecycle errors.
//!
//! Request-level failures never surface here; they are rendered as HTTP
//! responses from [`HookError`](hermes_core::HookError).

use hermes_config::ConfigError;
use thiserror::Error;

/// Errors from building or running a [`Server`](crate::Server).
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be parsed or bound.
    #[error("Failed to bind: {0}")]
    BindError(String),

    /// Accept or socket I/O failure.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The configuration did not yield a usable server.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
