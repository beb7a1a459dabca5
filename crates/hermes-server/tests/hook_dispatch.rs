//! End-to-end hook dispatch through `Server::handle` and over TCP.

use std::time::Duration;

use bytes::Bytes;
use hermes_authz::{RbacEnforcer, RbacPolicyConfig};
use hermes_config::HermesConfig;
use hermes_core::{
    ClientResponse, HookError, Json, MiddlewareHook, OperationBody, UploadBody, UploadHook,
    UploadHookResponse, CYCLE_COUNTER_HEADER,
};
use hermes_json::{restore_bytes, scan_at, JsonPath, Normalizer};
use hermes_server::{HookRegistry, HookRequest, Server, ServerBuilder, ShutdownSignal};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};

fn post(uri: &str, body: Value) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("X-Tenant", "acme")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn call(server: &Server, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = server.handle(post(uri, body)).await;
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn registry() -> HookRegistry {
    let mut registry = HookRegistry::new();
    registry
        .register_operation_hook(
            "Users/Update",
            MiddlewareHook::MutatingPreResolve,
            |_req, mut body: OperationBody<Json, Json>| async move {
                if let Some(input) = body.input.as_mut() {
                    input.retain(|_, v| !v.is_null() && v != &json!("") && v != &json!(false));
                    input.insert("updatedBy".into(), json!("hook"));
                }
                Ok(Some(body))
            },
        )
        .register_operation_hook(
            "Users/Get",
            MiddlewareHook::PreResolve,
            |req: HookRequest, _body: OperationBody<Json, Json>| async move {
                let counter = req.client().headers().get(CYCLE_COUNTER_HEADER).cloned();
                match counter.as_deref() {
                    Some("1") => Ok(None),
                    other => Err(HookError::resolver(format!("unexpected counter {other:?}"))),
                }
            },
        )
        .register_proxy_hook(
            "payments/charge",
            |_req, body| async move {
                Ok(Some(ClientResponse {
                    request: body.wg.client_request.unwrap_or_default(),
                    status: "200 OK".into(),
                    status_code: 200,
                }))
            },
            Some(RbacEnforcer::builder().require_any(["billing"]).build()),
        )
        .register_proxy_hook("reports/export", |_req, _body| async { Ok(None) }, None)
        .register_upload_hook(
            "s3",
            "avatar",
            UploadHook::PreUpload,
            |_req, body: UploadBody<Json>| async move {
                Ok::<_, HookError>(UploadHookResponse {
                    file_key: Some(format!("avatars/{}", body.file.name)),
                    error: None,
                })
            },
        );
    registry
}

#[tokio::test]
async fn mutating_pre_resolve_restores_zero_values() {
    let server = Server::builder().registry(registry()).build();
    let (status, out) = call(
        &server,
        "/operation/Users/Update/mutatingPreResolve",
        json!({"input": {"id": 7, "name": "", "active": false, "nickname": null}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["op"], "Users/Update");
    assert_eq!(out["hook"], "mutatingPreResolve");
    assert_eq!(
        out["input"],
        json!({"id": 7, "updatedBy": "hook", "name": "", "active": false, "nickname": null})
    );
    assert_eq!(out["setClientRequestHeaders"]["X-Tenant"], "acme");
}

#[tokio::test]
async fn cycle_counter_is_forwarded_and_enforced() {
    let server = Server::builder().registry(registry()).build();

    let (status, _) = call(&server, "/operation/Users/Get/preResolve", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, out) = call(
        &server,
        "/operation/Users/Get/preResolve?cycleCounter=16",
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(out["error"]["message"], "maximum recursion limit reached (16)");
}

#[tokio::test]
async fn configured_recursion_limit_applies() {
    let server = Server::builder()
        .registry(registry())
        .recursion_limit(2)
        .build();
    let (status, out) = call(
        &server,
        "/operation/Users/Get/preResolve?cycleCounter=2",
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(out["error"]["details"]["limit"], 2);
}

#[tokio::test]
async fn proxy_hook_enforces_roles() {
    let server = Server::builder().registry(registry()).build();
    let body = |roles: Value| {
        json!({
            "name": "payments/charge",
            "__wg": {
                "user": {"userId": "u-1", "roles": roles},
                "clientRequest": {"method": "POST", "requestURI": "/charge", "headers": {}}
            }
        })
    };

    let (status, out) = call(&server, "/proxy/payments/charge", body(json!(["billing"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["op"], "payments/charge");
    assert_eq!(out["hook"], "proxyHook");
    assert_eq!(out["response"]["response"]["request"]["requestURI"], "/charge");

    let (status, out) = call(&server, "/proxy/payments/charge", body(json!(["guest"]))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(out["error"]["code"], "ACCESS_DENIED");
}

#[tokio::test]
async fn proxy_without_policy_uses_configuration() {
    let config = HermesConfig::builder()
        .proxy(
            "reports/export",
            RbacPolicyConfig {
                auth_required: true,
                ..RbacPolicyConfig::default()
            },
        )
        .build();
    let server = ServerBuilder::from_config(&config)
        .unwrap()
        .registry(registry())
        .build();

    let (status, _) = call(&server, "/proxy/reports/export", json!({"name": "reports/export"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, out) = call(
        &server,
        "/proxy/reports/export",
        json!({"name": "reports/export", "__wg": {"user": {"userId": "u-2"}}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out, json!({"op": "reports/export", "hook": "proxyHook", "response": {}}));
}

#[tokio::test]
async fn proxy_without_any_policy_allows_anonymous() {
    let server = Server::builder().registry(registry()).build();
    let (status, _) = call(&server, "/proxy/reports/export", json!({"name": "reports/export"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn upload_hook_returns_file_key() {
    let server = Server::builder().registry(registry()).build();
    let (status, out) = call(
        &server,
        "/upload/s3/avatar/preUpload",
        json!({"file": {"name": "me.png", "size": 10, "type": "image/png"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out, json!({"fileKey": "avatars/me.png"}));
}

fn restore_into_response_data(input: &[u8], output: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let request: Value = serde_json::from_slice(input)?;
    let records = scan_at(&request["input"], &JsonPath::parse("response.data").unwrap());
    restore_bytes(&records, output)
}

#[tokio::test]
async fn custom_rewrite_restores_under_response_data() {
    let mut registry = HookRegistry::new();
    registry.register_operation_hook(
        "Users/Create",
        MiddlewareHook::CustomResolve,
        |_req, mut body: OperationBody<Json, Json>| async move {
            body.reset_response(Some(Json::new()));
            body.input = None;
            Ok(Some(body))
        },
    );
    let server = Server::builder()
        .registry(registry)
        .normalizer(Normalizer::default().with_rewrite(
            MiddlewareHook::CustomResolve,
            restore_into_response_data,
        ))
        .build();

    let (status, out) = call(
        &server,
        "/operation/Users/Create/customResolve",
        json!({"input": {"name": "", "active": false}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["response"]["data"], json!({"name": "", "active": false}));
}

#[tokio::test]
async fn serves_over_tcp_until_shutdown() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::builder()
        .registry(registry())
        .shutdown_timeout(Duration::from_secs(1))
        .build();
    let shutdown = ShutdownSignal::new();
    let task = tokio::spawn(server.serve(listener, shutdown.clone()));

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let health: Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["hooks"], 5);

    let response = client
        .post(format!("http://{addr}/upload/s3/avatar/preUpload"))
        .json(&json!({"file": {"name": "x.jpg"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();
}
