//! Route table for hook calls.
//!
//! Hook paths are fixed at registration, and operation paths may themselves
//! contain slashes (`/operation/Users/Get/preResolve`), so routes are exact
//! strings rather than templates. Every hook route answers `POST` only.

use std::collections::BTreeMap;

use hermes_core::{MiddlewareHook, UploadHook};
use http::Method;

use crate::handler::{ErasedHook, HookKind};

/// Route of an operation hook.
///
/// ```rust
/// use hermes_core::MiddlewareHook;
/// use hermes_server::router::operation_route;
///
/// assert_eq!(
///     operation_route("Users/Get", MiddlewareHook::PreResolve),
///     "/operation/Users/Get/preResolve"
/// );
/// ```
pub fn operation_route(path: &str, hook: MiddlewareHook) -> String {
    format!("/operation/{}/{}", trim(path), hook.as_str())
}

/// Route of a proxy hook.
pub fn proxy_route(name: &str) -> String {
    format!("/proxy/{}", trim(name))
}

/// Route of an upload hook.
pub fn upload_route(provider: &str, profile: &str, hook: UploadHook) -> String {
    format!("/upload/{}/{}/{}", trim(provider), trim(profile), hook.as_str())
}

fn trim(segment: &str) -> &str {
    segment.trim_matches('/')
}

/// A registered hook route.
#[derive(Clone)]
pub struct RouteEntry {
    /// Hook family.
    pub kind: HookKind,
    /// Hook label for metrics, e.g. `preResolve` or `proxyHook`.
    pub hook: &'static str,
    /// The handler.
    pub handler: ErasedHook,
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("kind", &self.kind)
            .field("hook", &self.hook)
            .finish_non_exhaustive()
    }
}

/// Exact-path route table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: BTreeMap<String, RouteEntry>,
}

impl Router {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route. A second registration of the same path replaces the first.
    pub fn insert(&mut self, path: String, entry: RouteEntry) {
        if self.routes.contains_key(&path) {
            tracing::warn!(path = %path, "Hook route registered twice, keeping the last one");
        }
        self.routes.insert(path, entry);
    }

    /// Looks up the route for a request. Only `POST` matches.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<&RouteEntry> {
        if method != Method::POST {
            return None;
        }
        let path = match path.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => path,
        };
        self.routes.get(path)
    }

    /// Returns `true` if `path` is registered.
    pub fn has_route(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    /// Registered paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Number of routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}
