//! Error types for Hermes.
//!
//! [`HookError`] is the error type shared by every hook handler. Each variant
//! belongs to an [`ErrorCategory`], which decides the HTTP status returned to
//! the gateway and the machine-readable code placed in the error envelope.
//!
//! | Variant | Category | Status |
//! |---|---|---|
//! | `MalformedInput` | `malformed_input` | 400 |
//! | `AccessDenied` | `access_denied` | 401 |
//! | `NotFound` | `not_found` | 404 |
//! | `RecursionLimitExceeded` | `recursion_limit` | 500 |
//! | `ResolverFailure` | `resolver` | 500 |
//! | `Internal` | `internal` | 500 |
//!
//! Proxy hooks answer resolver failures with 400 instead; that override lives
//! in the proxy handler, not here.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`HookError`].
pub type HookResult<T> = Result<T, HookError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The request body could not be parsed.
    MalformedInput,
    /// The principal failed an access-control gate.
    AccessDenied,
    /// No hook is registered for the requested route.
    NotFound,
    /// The hook chain re-entered the gateway too many times.
    RecursionLimit,
    /// The user-supplied resolver returned an error.
    Resolver,
    /// Internal server errors.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::MalformedInput => StatusCode::BAD_REQUEST,
            // The gateway only understands 401 for a rejected hook call.
            Self::AccessDenied => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RecursionLimit | Self::Resolver | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Standard error type for hook processing.
///
/// None of these errors are retried by Hermes. A recursion failure in
/// particular would only reproduce the same loop.
///
/// # Example
///
/// ```
/// use hermes_core::{ErrorCategory, HookError};
///
/// let error = HookError::malformed_input("expected value at line 1 column 1");
/// assert_eq!(error.category(), ErrorCategory::MalformedInput);
/// ```
#[derive(Error, Debug)]
pub enum HookError {
    /// The inbound body is not valid JSON or does not match the hook's payload type.
    #[error("malformed input: {message}")]
    MalformedInput {
        /// Parser message.
        message: String,
    },

    /// The cycle counter reached the configured ceiling.
    #[error("maximum recursion limit reached ({limit})")]
    RecursionLimitExceeded {
        /// The configured ceiling.
        limit: u32,
    },

    /// An RBAC gate rejected the principal.
    #[error("unauthorized")]
    AccessDenied {
        /// Which gate failed, for logs only.
        reason: Option<String>,
    },

    /// The resolver returned an error. The message is passed through verbatim.
    #[error("{message}")]
    ResolverFailure {
        /// Resolver message.
        message: String,
    },

    /// Nothing is registered for the requested path.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// Internal server error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl HookError {
    /// Creates a malformed input error.
    #[must_use]
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    /// Creates a recursion limit error carrying the configured ceiling.
    #[must_use]
    pub const fn recursion_limit(limit: u32) -> Self {
        Self::RecursionLimitExceeded { limit }
    }

    /// Creates an access denied error.
    #[must_use]
    pub const fn access_denied() -> Self {
        Self::AccessDenied { reason: None }
    }

    /// Creates an access denied error that remembers the failing gate.
    #[must_use]
    pub fn access_denied_because(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: Some(reason.into()),
        }
    }

    /// Creates a resolver failure.
    #[must_use]
    pub fn resolver(message: impl Into<String>) -> Self {
        Self::ResolverFailure {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedInput { .. } => ErrorCategory::MalformedInput,
            Self::RecursionLimitExceeded { .. } => ErrorCategory::RecursionLimit,
            Self::AccessDenied { .. } => ErrorCategory::AccessDenied,
            Self::ResolverFailure { .. } => ErrorCategory::Resolver,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "MALFORMED_INPUT",
            Self::RecursionLimitExceeded { .. } => "RECURSION_LIMIT_EXCEEDED",
            Self::AccessDenied { .. } => "ACCESS_DENIED",
            Self::ResolverFailure { .. } => "RESOLVER_FAILURE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::RecursionLimitExceeded { limit } => Some(serde_json::json!({
                "limit": limit
            })),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for HookError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed_input(err.to_string())
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
