//! The four-gate role enforcer.
//!
//! Gates are evaluated in a fixed order and the first failure wins:
//!
//! ```text
//! authRequired? ─no──► allow
//!      │yes
//! principal? ───no──► deny (authentication)
//!      │
//! requireAll ─ every listed role held, or list empty
//! requireAny ─ at least one listed role held, or list empty
//! denyAll ──── not every listed role held, or list empty
//! denyAny ──── no listed role held, or list empty
//!      │
//!    allow
//! ```

use hermes_core::User;
use std::collections::BTreeSet;
use std::fmt;

/// The gate that rejected a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Authentication is required and no principal was present.
    Authentication,
    /// The principal lacks one of the `requireAll` roles.
    RequireAll,
    /// The principal holds none of the `requireAny` roles.
    RequireAny,
    /// The principal holds every `denyAll` role.
    DenyAll,
    /// The principal holds one of the `denyAny` roles.
    DenyAny,
}

impl Gate {
    /// Name used in logs and metrics labels.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::RequireAll => "requireAll",
            Self::RequireAny => "requireAny",
            Self::DenyAll => "denyAll",
            Self::DenyAny => "denyAny",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`RbacEnforcer::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The principal may proceed.
    Allow,
    /// The principal was rejected.
    Deny {
        /// The first gate that failed.
        gate: Gate,
    },
}

impl PolicyDecision {
    /// Returns `true` for [`PolicyDecision::Allow`].
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Role-based access policy for a single hook.
///
/// Built once when the hook is registered and only read afterwards, so one
/// instance can be shared across any number of concurrent requests.
///
/// The default enforcer does not require authentication and therefore
/// admits everyone.
///
/// # Example
///
/// ```
/// use hermes_authz::RbacEnforcer;
/// use hermes_core::User;
///
/// let enforcer = RbacEnforcer::builder()
///     .require_all(["admin", "ops"])
///     .deny_any(["banned"])
///     .build();
///
/// assert!(!enforcer.enforce(Some(&User::with_roles("u1", ["admin"]))));
/// assert!(enforcer.enforce(Some(&User::with_roles("u2", ["admin", "ops"]))));
/// assert!(!enforcer.enforce(None));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RbacEnforcer {
    auth_required: bool,
    require_match_all: BTreeSet<String>,
    require_match_any: BTreeSet<String>,
    deny_match_all: BTreeSet<String>,
    deny_match_any: BTreeSet<String>,
}

impl RbacEnforcer {
    /// An enforcer that admits every caller, authenticated or not.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Starts a builder. Adding any role list implies `auth_required`.
    pub fn builder() -> RbacBuilder {
        RbacBuilder::default()
    }

    /// Whether a principal is needed at all.
    pub const fn auth_required(&self) -> bool {
        self.auth_required
    }

    /// Runs every gate and reports the first failure.
    pub fn decide(&self, user: Option<&User>) -> PolicyDecision {
        if !self.auth_required {
            return PolicyDecision::Allow;
        }
        let Some(user) = user else {
            return PolicyDecision::Deny {
                gate: Gate::Authentication,
            };
        };
        let roles = user.role_set();
        let held = |role: &String| roles.contains(role.as_str());

        let gates = [
            (Gate::RequireAll, self.require_match_all.iter().all(held)),
            (
                Gate::RequireAny,
                self.require_match_any.is_empty() || self.require_match_any.iter().any(held),
            ),
            (
                Gate::DenyAll,
                self.deny_match_all.is_empty() || !self.deny_match_all.iter().all(held),
            ),
            (Gate::DenyAny, !self.deny_match_any.iter().any(held)),
        ];

        gates
            .into_iter()
            .find(|(_, passed)| !passed)
            .map_or(PolicyDecision::Allow, |(gate, _)| PolicyDecision::Deny { gate })
    }

    /// Returns `true` when the principal may proceed.
    ///
    /// Never fails; callers turn `false` into an access-denied response.
    pub fn enforce(&self, user: Option<&User>) -> bool {
        let decision = self.decide(user);
        if let PolicyDecision::Deny { gate } = decision {
            tracing::debug!(
                gate = %gate,
                user = user.map(User::log_id).as_deref().unwrap_or("anonymous"),
                "RBAC gate rejected principal"
            );
        }
        decision.is_allowed()
    }

    /// Roles every principal must hold.
    pub const fn require_match_all(&self) -> &BTreeSet<String> {
        &self.require_match_all
    }

    /// Roles of which a principal must hold at least one.
    pub const fn require_match_any(&self) -> &BTreeSet<String> {
        &self.require_match_any
    }

    /// Roles whose full combination is rejected.
    pub const fn deny_match_all(&self) -> &BTreeSet<String> {
        &self.deny_match_all
    }

    /// Roles any one of which is rejected.
    pub const fn deny_match_any(&self) -> &BTreeSet<String> {
        &self.deny_match_any
    }
}

/// Builder for [`RbacEnforcer`].
#[derive(Debug, Default)]
pub struct RbacBuilder {
    enforcer: RbacEnforcer,
}

impl RbacBuilder {
    /// Requires an authenticated principal even without any role list.
    #[must_use]
    pub fn auth_required(mut self) -> Self {
        self.enforcer.auth_required = true;
        self
    }

    /// Every one of `roles` must be held.
    #[must_use]
    pub fn require_all<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        extend(&mut self.enforcer.require_match_all, roles);
        self.auth_required()
    }

    /// At least one of `roles` must be held.
    #[must_use]
    pub fn require_any<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        extend(&mut self.enforcer.require_match_any, roles);
        self.auth_required()
    }

    /// Rejects principals holding all of `roles`.
    #[must_use]
    pub fn deny_all<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        extend(&mut self.enforcer.deny_match_all, roles);
        self.auth_required()
    }

    /// Rejects principals holding any of `roles`.
    #[must_use]
    pub fn deny_any<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        extend(&mut self.enforcer.deny_match_any, roles);
        self.auth_required()
    }

    /// Finishes the enforcer.
    pub fn build(self) -> RbacEnforcer {
        self.enforcer
    }
}

fn extend<I>(set: &mut BTreeSet<String>, roles: I)
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    set.extend(roles.into_iter().map(Into::into));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn user(roles: &[&str]) -> User {
        User::with_roles("u", roles.iter().copied())
    }

    #[test]
    fn test_no_auth_required_allows_anyone() {
        let enforcer = RbacEnforcer::allow_all();
        assert!(enforcer.enforce(None));
        assert!(enforcer.enforce(Some(&user(&[]))));
    }

    #[test]
    fn test_auth_required_denies_missing_principal() {
        let enforcer = RbacEnforcer::builder().auth_required().build();
        assert_eq!(
            enforcer.decide(None),
            PolicyDecision::Deny {
                gate: Gate::Authentication
            }
        );
        assert!(enforcer.enforce(Some(&user(&[]))));
    }

    #[test]
    fn test_require_all() {
        let enforcer = RbacEnforcer::builder().require_all(["admin", "ops"]).build();
        assert_eq!(
            enforcer.decide(Some(&user(&["admin"]))),
            PolicyDecision::Deny {
                gate: Gate::RequireAll
            }
        );
        assert!(enforcer.enforce(Some(&user(&["admin", "ops"]))));
        assert!(enforcer.enforce(Some(&user(&["ops", "admin", "extra"]))));
    }

    #[test]
    fn test_require_any() {
        let enforcer = RbacEnforcer::builder().require_any(["admin", "ops"]).build();
        assert!(enforcer.enforce(Some(&user(&["ops"]))));
        assert_eq!(
            enforcer.decide(Some(&user(&["guest"]))),
            PolicyDecision::Deny {
                gate: Gate::RequireAny
            }
        );
    }

    #[test]
    fn test_deny_all_needs_every_role() {
        let enforcer = RbacEnforcer::builder().deny_all(["intern", "contractor"]).build();
        assert!(enforcer.enforce(Some(&user(&["intern"]))));
        assert_eq!(
            enforcer.decide(Some(&user(&["contractor", "intern"]))),
            PolicyDecision::Deny { gate: Gate::DenyAll }
        );
    }

    #[test]
    fn test_deny_any() {
        let enforcer = RbacEnforcer::builder().deny_any(["banned"]).build();
        assert_eq!(
            enforcer.decide(Some(&user(&["user", "banned"]))),
            PolicyDecision::Deny { gate: Gate::DenyAny }
        );
        assert!(enforcer.enforce(Some(&user(&["user"]))));
    }

    #[test]
    fn test_deny_any_overrides_require_gates() {
        let enforcer = RbacEnforcer::builder()
            .require_all(["admin"])
            .require_any(["admin"])
            .deny_any(["banned"])
            .build();
        assert!(!enforcer.enforce(Some(&user(&["admin", "banned"]))));
    }

    #[test]
    fn test_first_failing_gate_is_reported() {
        let enforcer = RbacEnforcer::builder()
            .require_all(["admin"])
            .deny_any(["banned"])
            .build();
        assert_eq!(
            enforcer.decide(Some(&user(&["banned"]))),
            PolicyDecision::Deny {
                gate: Gate::RequireAll
            }
        );
    }

    #[test]
    fn test_gate_names() {
        assert_eq!(Gate::RequireAll.to_string(), "requireAll");
        assert_eq!(Gate::Authentication.as_str(), "authentication");
    }

    proptest! {
        #[test]
        fn unauthenticated_policy_allows_everything(
            roles in prop::collection::vec("[a-d]", 0..4),
            deny in prop::collection::vec("[a-d]", 1..4),
        ) {
            let mut enforcer = RbacEnforcer::builder().deny_any(deny).build();
            enforcer.auth_required = false;
            let user = User::with_roles("u", roles);
            prop_assert!(enforcer.enforce(Some(&user)));
            prop_assert!(enforcer.enforce(None));
        }

        #[test]
        fn deny_any_hit_always_denies(
            roles in prop::collection::vec("[a-d]", 0..4),
            require in prop::collection::vec("[a-d]", 0..3),
        ) {
            let enforcer = RbacEnforcer::builder()
                .require_any(require)
                .deny_any(["banned"])
                .build();
            let mut held = roles;
            held.push("banned".to_string());
            prop_assert!(!enforcer.enforce(Some(&User::with_roles("u", held))));
        }
    }
}
