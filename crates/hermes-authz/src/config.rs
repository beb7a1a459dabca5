//! Declarative RBAC policies.
//!
//! Policies for proxy hooks can be given in configuration instead of code.
//! A policy with `auth_required = false` ignores its role lists.

use crate::error::{AuthzError, AuthzResult};
use crate::rbac::RbacEnforcer;
use serde::{Deserialize, Serialize};

/// Serializable form of an [`RbacEnforcer`].
///
/// ```toml
/// auth_required = true
/// require_match_any = ["admin", "ops"]
/// deny_match_any = ["banned"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RbacPolicyConfig {
    /// Whether a principal is required. Without it every caller is admitted.
    #[serde(default)]
    pub auth_required: bool,
    /// Roles that must all be held.
    #[serde(default)]
    pub require_match_all: Vec<String>,
    /// Roles of which at least one must be held.
    #[serde(default)]
    pub require_match_any: Vec<String>,
    /// Roles whose full combination is rejected.
    #[serde(default)]
    pub deny_match_all: Vec<String>,
    /// Roles any one of which is rejected.
    #[serde(default)]
    pub deny_match_any: Vec<String>,
}

impl RbacPolicyConfig {
    fn role_lists(&self) -> [(&'static str, &[String]); 4] {
        [
            ("require_match_all", &self.require_match_all),
            ("require_match_any", &self.require_match_any),
            ("deny_match_all", &self.deny_match_all),
            ("deny_match_any", &self.deny_match_any),
        ]
    }

    /// Rejects blank role names.
    pub fn validate(&self, name: &str) -> AuthzResult<()> {
        for (list, roles) in self.role_lists() {
            if roles.iter().any(|role| role.trim().is_empty()) {
                return Err(AuthzError::invalid_policy(
                    name,
                    format!("{list} contains an empty role"),
                ));
            }
        }
        if !self.auth_required && self.role_lists().iter().any(|(_, roles)| !roles.is_empty()) {
            tracing::warn!(
                policy = name,
                "Role lists are ignored because auth_required is false"
            );
        }
        Ok(())
    }

    /// Validates and builds the enforcer.
    pub fn build(&self, name: &str) -> AuthzResult<RbacEnforcer> {
        self.validate(name)?;
        if !self.auth_required {
            return Ok(RbacEnforcer::allow_all());
        }
        Ok(RbacEnforcer::builder()
            .auth_required()
            .require_all(self.require_match_all.iter().cloned())
            .require_any(self.require_match_any.iter().cloned())
            .deny_all(self.deny_match_all.iter().cloned())
            .deny_any(self.deny_match_any.iter().cloned())
            .build())
    }
}
