//! Explicit hook registration.
//!
//! Every hook the server answers is listed here at startup. Nothing is
//! discovered at runtime; once the registry is handed to
//! [`ServerBuilder::registry`](crate::ServerBuilder::registry) the table is frozen.
//!
//! ```rust
//! use hermes_core::{HookError, Json, MiddlewareHook, OperationBody};
//! use hermes_server::HookRegistry;
//!
//! let mut registry = HookRegistry::new();
//! registry.register_operation_hook(
//!     "Users/Get",
//!     MiddlewareHook::PreResolve,
//!     |_req, body: OperationBody<Json, Json>| async move {
//!         Ok::<_, HookError>(Some(body))
//!     },
//! );
//! assert!(registry.contains("/operation/Users/Get/preResolve"));
//! ```

use std::collections::BTreeMap;
use std::future::Future;

use hermes_authz::RbacEnforcer;
use hermes_core::{
    ClientResponse, HookResult, MiddlewareHook, OperationBody, ProxyHookBody, UploadBody,
    UploadHook, UploadHookResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::handler::{HookKind, HookRequest};
use crate::operation::operation_handler;
use crate::proxy::{box_proxy_resolver, proxy_handler, ProxyResolver, PROXY_HOOK};
use crate::router::{operation_route, proxy_route, upload_route, RouteEntry, Router};
use crate::upload::upload_handler;

struct PendingProxy {
    resolver: ProxyResolver,
    policy: Option<RbacEnforcer>,
}

/// Table of hook resolvers, built once before the server starts.
#[derive(Default)]
pub struct HookRegistry {
    routes: Router,
    proxies: BTreeMap<String, PendingProxy>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("routes", &self.routes)
            .field("proxies", &self.proxies.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HookRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resolver` for `hook` of the operation at `path`.
    ///
    /// `I` and `O` are the operation's input and response data types. The
    /// resolver owns the body it is given. It returns `Ok(Some(body))` to send
    /// its edits back, or `Ok(None)` to hand back the body as it was received;
    /// edits made before returning `Ok(None)` are discarded.
    pub fn register_operation_hook<I, O, F, Fut>(
        &mut self,
        path: &str,
        hook: MiddlewareHook,
        resolver: F,
    ) -> &mut Self
    where
        I: Serialize + DeserializeOwned + Send + 'static,
        O: Serialize + DeserializeOwned + Send + 'static,
        F: Fn(HookRequest, OperationBody<I, O>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<OperationBody<I, O>>>> + Send + 'static,
    {
        let route = operation_route(path, hook);
        let op = path.trim_matches('/').to_string();
        tracing::debug!("Registered operation hook [{route}]");
        self.routes.insert(
            route,
            RouteEntry {
                kind: HookKind::Operation,
                hook: hook.as_str(),
                handler: operation_handler(op, hook, resolver),
            },
        );
        self
    }

    /// Registers a proxy hook under `name`.
    ///
    /// Without a `policy` the proxy falls back to the one configured under
    /// `[proxies.<name>]`, and to an allow-all policy when there is none.
    pub fn register_proxy_hook<F, Fut>(
        &mut self,
        name: &str,
        resolver: F,
        policy: Option<RbacEnforcer>,
    ) -> &mut Self
    where
        F: Fn(HookRequest, ProxyHookBody) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<ClientResponse>>> + Send + 'static,
    {
        let name = name.trim_matches('/').to_string();
        tracing::debug!("Registered proxy hook [{}]", proxy_route(&name));
        if self.proxies.contains_key(&name) {
            tracing::warn!(proxy = %name, "Proxy hook registered twice, keeping the last one");
        }
        self.proxies.insert(
            name,
            PendingProxy {
                resolver: box_proxy_resolver(resolver),
                policy,
            },
        );
        self
    }

    /// Registers `hook` for uploads to `provider` under `profile`.
    ///
    /// `M` is the profile's metadata type.
    pub fn register_upload_hook<M, F, Fut>(
        &mut self,
        provider: &str,
        profile: &str,
        hook: UploadHook,
        resolver: F,
    ) -> &mut Self
    where
        M: DeserializeOwned + Send + 'static,
        F: Fn(HookRequest, UploadBody<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<UploadHookResponse>> + Send + 'static,
    {
        let route = upload_route(provider, profile, hook);
        tracing::debug!("Registered upload hook [{route}]");
        self.routes.insert(
            route.clone(),
            RouteEntry {
                kind: HookKind::Upload,
                hook: hook.as_str(),
                handler: upload_handler(route, hook, resolver),
            },
        );
        self
    }

    /// Returns `true` if a hook answers at `route`.
    pub fn contains(&self, route: &str) -> bool {
        self.routes.has_route(route)
            || route
                .strip_prefix("/proxy/")
                .is_some_and(|name| self.proxies.contains_key(name))
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.routes.route_count() + self.proxies.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freezes the table. `configured` supplies policies for proxies
    /// registered without one.
    pub(crate) fn into_router(self, configured: &BTreeMap<String, RbacEnforcer>) -> Router {
        let mut router = self.routes;
        for (name, pending) in self.proxies {
            let enforcer = pending
                .policy
                .or_else(|| configured.get(&name).cloned())
                .unwrap_or_default();
            if enforcer.auth_required() {
                tracing::debug!(proxy = %name, "Proxy hook requires authentication");
            }
            router.insert(
                proxy_route(&name),
                RouteEntry {
                    kind: HookKind::Proxy,
                    hook: PROXY_HOOK,
                    handler: proxy_handler(name, pending.resolver, enforcer),
                },
            );
        }
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{HookError, Json};
    use http::Method;

    fn registry() -> HookRegistry {
        let mut registry = HookRegistry::new();
        registry
            .register_operation_hook(
                "/Users/Get/",
                MiddlewareHook::PostResolve,
                |_req, _body: OperationBody<Json, Json>| async { Ok(None) },
            )
            .register_proxy_hook("payments/charge", |_req, _body| async { Ok(None) }, None)
            .register_upload_hook(
                "s3",
                "avatar",
                UploadHook::PostUpload,
                |_req, _body: UploadBody<Json>| async {
                    Err(HookError::resolver("not stored"))
                },
            );
        registry
    }

    #[test]
    fn test_routes_are_listed() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
        assert!(registry.contains("/operation/Users/Get/postResolve"));
        assert!(registry.contains("/proxy/payments/charge"));
        assert!(registry.contains("/upload/s3/avatar/postUpload"));
        assert!(!registry.contains("/proxy/payments"));
    }

    #[test]
    fn test_into_router_includes_proxies() {
        let router = registry().into_router(&BTreeMap::new());
        assert_eq!(router.route_count(), 3);
        let entry = router
            .match_route(&Method::POST, "/proxy/payments/charge")
            .unwrap();
        assert_eq!(entry.kind, HookKind::Proxy);
        assert_eq!(entry.hook, "proxyHook");
    }

    #[test]
    fn test_debug_lists_proxy_names() {
        let debug = format!("{:?}", registry());
        assert!(debug.contains("payments/charge"));
    }
}
