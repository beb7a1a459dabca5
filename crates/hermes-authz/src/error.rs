//! Error types for the authorization crate.

use hermes_core::HookError;
use thiserror::Error;

use crate::rbac::Gate;

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Errors that can occur while building or applying a policy.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthzError {
    /// A policy definition is not usable.
    #[error("invalid policy '{name}': {message}")]
    InvalidPolicy {
        /// Policy (proxy hook) name.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    /// A gate rejected the principal.
    #[error("access denied by {gate} gate")]
    AccessDenied {
        /// The gate that failed.
        gate: Gate,
    },
}

impl AuthzError {
    /// Create an invalid policy error.
    pub fn invalid_policy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Check if this is an access denied error.
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}

impl From<AuthzError> for HookError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::AccessDenied { gate } => HookError::access_denied_because(gate.as_str()),
            other => HookError::internal_with_source("authorization failure", other),
        }
    }
}
