//! Proxy hooks.
//!
//! A proxy hook is addressed by name and always guarded by an
//! [`RbacEnforcer`]. The principal comes from the `__wg.user` member of the
//! body, so the body is parsed first; a denial then ends the call with 401
//! before the resolver is reached.
//!
//! The reply wraps the resolver output:
//!
//! ```text
//! {"op": <name>, "hook": "proxyHook", "response": {"response": <output>}}
//! ```
//!
//! and leaves `response` empty when the resolver produced nothing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hermes_authz::{authorize, RbacEnforcer};
use hermes_core::{ClientResponse, HookError, HookResult, ProxyHookBody, User};
use hermes_telemetry::record_rbac_decision;
use http::StatusCode;
use serde::Serialize;

use crate::handler::{BoxedHookFuture, ErasedHook, HookReply, HookRequest, Invocation};

/// Hook label of every proxy call.
pub const PROXY_HOOK: &str = "proxyHook";

pub(crate) type ProxyFuture =
    Pin<Box<dyn Future<Output = HookResult<Option<ClientResponse>>> + Send>>;

/// A proxy resolver with its future boxed.
pub(crate) type ProxyResolver =
    Arc<dyn Fn(HookRequest, ProxyHookBody) -> ProxyFuture + Send + Sync>;

pub(crate) fn box_proxy_resolver<F, Fut>(resolver: F) -> ProxyResolver
where
    F: Fn(HookRequest, ProxyHookBody) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<Option<ClientResponse>>> + Send + 'static,
{
    Arc::new(move |request: HookRequest, body: ProxyHookBody| -> ProxyFuture {
        Box::pin(resolver(request, body))
    })
}

#[derive(Serialize)]
struct ProxyHookReply {
    op: String,
    hook: &'static str,
    response: ProxyHookResponse,
}

#[derive(Serialize)]
struct ProxyHookResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<ClientResponse>,
}

pub(crate) fn proxy_handler(
    name: String,
    resolver: ProxyResolver,
    enforcer: RbacEnforcer,
) -> ErasedHook {
    let name: Arc<str> = name.into();
    let enforcer = Arc::new(enforcer);

    Arc::new(move |invocation: Invocation| -> BoxedHookFuture {
        let name = Arc::clone(&name);
        let resolver = Arc::clone(&resolver);
        let enforcer = Arc::clone(&enforcer);
        Box::pin(async move { run(&name, &resolver, &enforcer, invocation).await })
    })
}

async fn run(
    name: &str,
    resolver: &ProxyResolver,
    enforcer: &RbacEnforcer,
    invocation: Invocation,
) -> HookReply {
    let request_id = invocation.context.request_id().to_string();

    let body: ProxyHookBody = match serde_json::from_slice(&invocation.body) {
        Ok(body) => body,
        Err(err) => {
            return HookReply::error_with_status(
                &HookError::from(err),
                StatusCode::BAD_REQUEST,
                Some(&request_id),
            )
        }
    };

    let user = body.wg.user.clone();
    let decision = authorize(enforcer, user.as_ref());
    record_rbac_decision(decision.is_ok());
    if let Err(denied) = decision {
        let who = user
            .as_ref()
            .map_or_else(|| "anonymous".to_string(), User::log_id);
        tracing::warn!(
            proxy = name,
            user = %who,
            reason = %denied,
            "Proxy hook denied"
        );
        return HookReply::error_with_status(
            &HookError::from(denied),
            StatusCode::UNAUTHORIZED,
            Some(&request_id),
        );
    }

    let mut context = invocation.context;
    context.set_user(user);
    let request = HookRequest::new(context, &invocation.client);

    let op = if body.name.is_empty() {
        name.to_string()
    } else {
        body.name.clone()
    };

    match resolver(request, body).await {
        Ok(response) => HookReply::json(
            StatusCode::OK,
            &ProxyHookReply {
                op,
                hook: PROXY_HOOK,
                response: ProxyHookResponse { response },
            },
        ),
        Err(err) => {
            tracing::error!(proxy = name, error = %err, "Proxy hook failed");
            HookReply::error_with_status(&err, StatusCode::BAD_REQUEST, Some(&request_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InternalClient;
    use bytes::Bytes;
    use hermes_core::{ClientRequest, HookContext};
    use hermes_json::Normalizer;
    use http::HeaderMap;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn invocation(body: Value) -> Invocation {
        Invocation {
            headers: HeaderMap::new(),
            query: None,
            body: Bytes::from(serde_json::to_vec(&body).unwrap()),
            context: HookContext::new(),
            client: InternalClient::new("http://gw"),
            recursion_limit: 16,
            normalizer: Arc::new(Normalizer::default()),
        }
    }

    fn decode(reply: &HookReply) -> Value {
        serde_json::from_slice(&reply.body).unwrap()
    }

    fn forwarding() -> ProxyResolver {
        box_proxy_resolver(|_req, body: ProxyHookBody| async move {
            Ok(Some(ClientResponse {
                request: body.wg.client_request.unwrap_or_default(),
                status: "200 OK".into(),
                status_code: 200,
            }))
        })
    }

    #[tokio::test]
    async fn test_allow_all_wraps_response() {
        let handler = proxy_handler("charge".into(), forwarding(), RbacEnforcer::allow_all());
        let reply = handler(invocation(json!({
            "name": "charge",
            "__wg": {"clientRequest": {"method": "POST", "requestURI": "/pay", "headers": {}}}
        })))
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        let out = decode(&reply);
        assert_eq!(out["op"], "charge");
        assert_eq!(out["hook"], "proxyHook");
        assert_eq!(out["response"]["response"]["statusCode"], 200);
        assert_eq!(out["response"]["response"]["request"]["requestURI"], "/pay");
    }

    #[tokio::test]
    async fn test_empty_result_leaves_response_empty() {
        let resolver = box_proxy_resolver(|_req, _body| async { Ok(None) });
        let handler = proxy_handler("noop".into(), resolver, RbacEnforcer::allow_all());
        let out = decode(&handler(invocation(json!({"name": "noop"}))).await);
        assert_eq!(out, json!({"op": "noop", "hook": "proxyHook", "response": {}}));
    }

    #[tokio::test]
    async fn test_denied_principal_never_reaches_resolver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resolver = box_proxy_resolver(move |_req, _body| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        });
        let enforcer = RbacEnforcer::builder().deny_any(["banned"]).build();
        let handler = proxy_handler("charge".into(), resolver, enforcer);

        let reply = handler(invocation(json!({
            "name": "charge",
            "__wg": {"user": {"userId": "u1", "roles": ["user", "banned"]}}
        })))
        .await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(decode(&reply)["error"]["message"], "unauthorized");

        let anonymous = handler(invocation(json!({"name": "charge"}))).await;
        assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolver_sees_principal() {
        let resolver = box_proxy_resolver(|req: HookRequest, _body| async move {
            assert!(req.user().is_some_and(|u| u.has_role("admin")));
            Ok(None)
        });
        let enforcer = RbacEnforcer::builder().require_all(["admin"]).build();
        let handler = proxy_handler("admin/op".into(), resolver, enforcer);
        let reply = handler(invocation(json!({
            "name": "admin/op",
            "__wg": {"user": {"userId": "u2", "roles": ["admin"]}}
        })))
        .await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_resolver_error_is_400() {
        let resolver = box_proxy_resolver(|_req, _body| async {
            Err(HookError::resolver("upstream unavailable"))
        });
        let handler = proxy_handler("x".into(), resolver, RbacEnforcer::allow_all());
        let reply = handler(invocation(json!({"name": "x"}))).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(decode(&reply)["error"]["message"], "upstream unavailable");
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let handler = proxy_handler("x".into(), forwarding(), RbacEnforcer::allow_all());
        let mut call = invocation(json!({}));
        call.body = Bytes::from_static(b"[1,");
        let reply = handler(call).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(decode(&reply)["error"]["code"], "MALFORMED_INPUT");
    }

    #[test]
    fn test_reply_shape_skips_missing_response() {
        let reply = ProxyHookReply {
            op: "a".into(),
            hook: PROXY_HOOK,
            response: ProxyHookResponse {
                response: Some(ClientResponse {
                    request: ClientRequest::default(),
                    status: String::new(),
                    status_code: 204,
                }),
            },
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["response"]["response"]["statusCode"], 204);
    }
}
