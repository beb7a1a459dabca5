//! Type-erased hook handlers.
//!
//! Resolvers are generic over their payload types. At registration each one
//! is wrapped into an [`ErasedHook`] that takes the raw call and returns a
//! finished [`HookReply`], so the router can store all of them side by side.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use hermes_core::{HookContext, HookError, User};
use hermes_json::Normalizer;
use http::{HeaderMap, StatusCode};
use serde::Serialize;

use crate::client::InternalClient;

/// Which family a hook route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// `/operation/{path}/{hook}`
    Operation,
    /// `/proxy/{name}`
    Proxy,
    /// `/upload/{provider}/{profile}/{hook}`
    Upload,
}

impl HookKind {
    /// Label used in logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Operation => "operation",
            Self::Proxy => "proxy",
            Self::Upload => "upload",
        }
    }
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a resolver receives besides its payload.
#[derive(Debug, Clone)]
pub struct HookRequest {
    context: HookContext,
    client: InternalClient,
}

impl HookRequest {
    /// Binds a context to a client that forwards the context's headers.
    pub fn new(context: HookContext, client: &InternalClient) -> Self {
        let client = client.with_headers(context.forward_headers());
        Self { context, client }
    }

    /// Per-request state.
    pub fn context(&self) -> &HookContext {
        &self.context
    }

    /// The principal, if the gateway forwarded one.
    pub fn user(&self) -> Option<&User> {
        self.context.user()
    }

    /// Gateway client carrying `Wg-Cycle-Counter` for nested calls.
    pub fn client(&self) -> &InternalClient {
        &self.client
    }
}

/// Everything the server knows about one inbound hook call.
#[derive(Debug)]
pub struct Invocation {
    /// Inbound request headers.
    pub headers: HeaderMap,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Request body.
    pub body: Bytes,
    /// Context seeded with the request id.
    pub context: HookContext,
    /// Base gateway client.
    pub client: InternalClient,
    /// Ceiling for the cycle counter.
    pub recursion_limit: u32,
    /// Output rewrites for operation hooks.
    pub normalizer: Arc<Normalizer>,
}

/// Status and JSON body of a finished hook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookReply {
    /// HTTP status.
    pub status: StatusCode,
    /// Response body, always JSON.
    pub body: Bytes,
}

impl HookReply {
    /// A 200 with a pre-encoded body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    /// Encodes `value`. An encoding failure becomes a 500 envelope.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                body: body.into(),
            },
            Err(err) => Self::error(
                &HookError::internal_with_source("response encoding failed", err),
                None,
            ),
        }
    }

    /// Renders `error` as an envelope with its own status.
    pub fn error(error: &HookError, request_id: Option<&str>) -> Self {
        Self::error_with_status(error, error.status_code(), request_id)
    }

    /// Renders `error` as an envelope with an explicit status.
    pub fn error_with_status(error: &HookError, status: StatusCode, request_id: Option<&str>) -> Self {
        let body = serde_json::to_vec(&error.to_envelope(request_id)).unwrap_or_default();
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Boxed future returned by an [`ErasedHook`].
pub type BoxedHookFuture = Pin<Box<dyn Future<Output = HookReply> + Send>>;

/// A registered hook with its payload types erased.
pub type ErasedHook = Arc<dyn Fn(Invocation) -> BoxedHookFuture + Send + Sync>;
