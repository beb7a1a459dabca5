//! Why a hook server configuration was rejected.
//!
//! Every variant names where the bad input came from: a file, an
//! environment variable, or a field of the merged configuration.

use std::path::{Path, PathBuf};

use hermes_authz::AuthzError;
use thiserror::Error;

/// A configuration that could not be loaded or does not hold together.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `with_file` was given a path that does not exist.
    #[error("no configuration file at {}", .path.display())]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read {}", .path.display())]
    ReadError {
        /// The unreadable path.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document did not match the schema.
    #[error("malformed TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The JSON document did not match the schema.
    #[error("malformed JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A field parsed but its value is unusable, e.g. a zero recursion depth.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path, e.g. `hooks.max_recursion_depth`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `HERMES__*` override could not be applied.
    #[error("cannot apply {var}: {reason}")]
    EnvParseError {
        /// The variable name.
        var: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Anything else that makes the configuration unusable, such as an
    /// unknown file extension.
    #[error("configuration rejected: {0}")]
    ValidationError(String),

    /// A `[proxies.<name>]` entry does not build an enforcer.
    #[error(transparent)]
    Policy(#[from] AuthzError),
}

impl ConfigError {
    pub(crate) fn file_not_found(path: &Path) -> Self {
        Self::FileNotFound {
            path: path.to_path_buf(),
        }
    }

    pub(crate) fn read_error(path: &Path, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.to_path_buf(),
            source,
        }
    }

    /// A bad value at the dotted `field`.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// The dotted field or variable the error is about, when there is one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidValue { field, .. } => Some(field),
            Self::EnvParseError { var, .. } => Some(var),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_missing_file_names_the_path() {
        let err = ConfigError::file_not_found(Path::new("/etc/hermes/hooks.toml"));
        assert_eq!(err.to_string(), "no configuration file at /etc/hermes/hooks.toml");
        assert!(err.field().is_none());
    }

    #[test]
    fn test_read_error_keeps_io_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::read_error(Path::new("hooks.toml"), io);
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("denied"));
    }

    #[test]
    fn test_field_of_value_and_env_errors() {
        let err = ConfigError::invalid_value("hooks.max_recursion_depth", "must be at least 1");
        assert_eq!(err.field(), Some("hooks.max_recursion_depth"));
        assert!(err.to_string().ends_with("must be at least 1"));

        let err = ConfigError::env_parse_error("HERMES__SERVER__REQUEST_TIMEOUT_MS", "expected integer");
        assert_eq!(err.field(), Some("HERMES__SERVER__REQUEST_TIMEOUT_MS"));
    }

    #[test]
    fn test_policy_error_is_transparent() {
        let err: ConfigError = AuthzError::invalid_policy("admin", "bad role").into();
        assert_eq!(
            err.to_string(),
            AuthzError::invalid_policy("admin", "bad role").to_string()
        );
    }
}
