//! Authenticated principal forwarded by the gateway.
//!
//! The gateway serializes the current user into `__wg.user` on every hook
//! call. Only the role set matters to access control; the remaining claims
//! are kept so resolvers can read them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The user on whose behalf a hook is invoked.
///
/// # Example
///
/// ```
/// use hermes_core::User;
///
/// let user = User::with_roles("u-1", ["admin", "ops"]);
/// assert!(user.has_role("ops"));
/// assert_eq!(user.log_id(), "user:u-1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable user identifier assigned by the identity provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Identity provider name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Identity provider id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Role identifiers held by the user.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Any other claims the gateway forwarded.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Creates a user with the given id and role set.
    pub fn with_roles<I, S>(user_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id: Some(user_id.into()),
            roles: roles.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Returns `true` if the user holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns the roles as a set, for gate evaluation.
    pub fn role_set(&self) -> BTreeSet<&str> {
        self.roles.iter().map(String::as_str).collect()
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never includes tokens or other claims.
    pub fn log_id(&self) -> String {
        match &self.user_id {
            Some(id) => format!("user:{id}"),
            None => "user:unknown".to_string(),
        }
    }
}
