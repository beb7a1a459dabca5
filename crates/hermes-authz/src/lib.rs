//! Hermes Authorization - role-based gating of proxy hooks
//!
//! Every proxy hook carries an [`RbacEnforcer`]. Before the resolver runs,
//! the enforcer checks the principal forwarded by the gateway against four
//! role lists. A rejection is reported as a plain `false`; the server turns
//! it into a 401 and never calls the resolver.
//!
//! # Example
//!
//! ```
//! use hermes_authz::{Gate, PolicyDecision, RbacEnforcer};
//! use hermes_core::User;
//!
//! let enforcer = RbacEnforcer::builder().deny_any(["banned"]).build();
//! let user = User::with_roles("u-1", ["user", "banned"]);
//!
//! assert_eq!(
//!     enforcer.decide(Some(&user)),
//!     PolicyDecision::Deny { gate: Gate::DenyAny }
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod rbac;

// Re-exports for convenience
pub use config::RbacPolicyConfig;
pub use error::{AuthzError, AuthzResult};
pub use rbac::{Gate, PolicyDecision, RbacBuilder, RbacEnforcer};

use hermes_core::User;

/// Runs `enforcer` and converts a rejection into [`AuthzError::AccessDenied`].
pub fn authorize(enforcer: &RbacEnforcer, user: Option<&User>) -> AuthzResult<()> {
    match enforcer.decide(user) {
        PolicyDecision::Allow => Ok(()),
        PolicyDecision::Deny { gate } => Err(AuthzError::AccessDenied { gate }),
    }
}
