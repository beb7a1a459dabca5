//! Operation hooks.
//!
//! A call to `/operation/{path}/{hook}` runs through these steps:
//!
//! 1. parse the body into the resolver's `OperationBody<I, O>` (400 on failure)
//! 2. check the cycle counter from `cycleCounter`, falling back to the
//!    `Wg-Cycle-Counter` header (500 once the ceiling is reached)
//! 3. force `op` and `hook` from the route and copy the inbound headers into
//!    `setClientRequestHeaders`
//! 4. run the resolver (500 on failure)
//! 5. echo the body when the resolver returned none, else encode its output
//!    and apply the hook's rewrite from the [`Normalizer`](hermes_json::Normalizer)

use std::future::Future;
use std::sync::Arc;

use hermes_core::{
    headers_to_object, CycleCounter, HookError, HookResult, MiddlewareHook, OperationBody,
    CYCLE_COUNTER_HEADER,
};
use hermes_telemetry::record_recursion_rejection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::handler::{BoxedHookFuture, ErasedHook, HookReply, HookRequest, Invocation};

#[derive(Debug, Default, Deserialize)]
struct HookQuery {
    #[serde(rename = "cycleCounter")]
    cycle_counter: Option<u32>,
}

/// Reads the inbound counter. Absent means the chain has not recursed yet.
fn inbound_cycle_counter(invocation: &Invocation) -> HookResult<CycleCounter> {
    if let Some(query) = invocation.query.as_deref() {
        let parsed: HookQuery = serde_urlencoded::from_str(query)
            .map_err(|err| HookError::malformed_input(format!("invalid cycleCounter: {err}")))?;
        if let Some(value) = parsed.cycle_counter {
            return Ok(CycleCounter::new(value));
        }
    }

    match invocation.headers.get(CYCLE_COUNTER_HEADER) {
        None => Ok(CycleCounter::default()),
        Some(raw) => raw
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .map(CycleCounter::new)
            .ok_or_else(|| HookError::malformed_input("invalid Wg-Cycle-Counter header")),
    }
}

pub(crate) fn operation_handler<I, O, F, Fut>(
    path: String,
    hook: MiddlewareHook,
    resolver: F,
) -> ErasedHook
where
    I: Serialize + DeserializeOwned + Send + 'static,
    O: Serialize + DeserializeOwned + Send + 'static,
    F: Fn(HookRequest, OperationBody<I, O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<Option<OperationBody<I, O>>>> + Send + 'static,
{
    let path: Arc<str> = path.into();
    let resolver = Arc::new(resolver);

    Arc::new(move |invocation: Invocation| -> BoxedHookFuture {
        let path = Arc::clone(&path);
        let resolver = Arc::clone(&resolver);
        Box::pin(async move {
            let request_id = invocation.context.request_id().to_string();
            match run(&path, hook, resolver.as_ref(), invocation).await {
                Ok(body) => HookReply::ok(body),
                Err(err) => {
                    if matches!(err, HookError::ResolverFailure { .. } | HookError::Internal { .. }) {
                        tracing::error!(op = %path, hook = %hook, error = %err, "Operation hook failed");
                    }
                    HookReply::error(&err, Some(&request_id))
                }
            }
        })
    })
}

async fn run<I, O, F, Fut>(
    path: &str,
    hook: MiddlewareHook,
    resolver: &F,
    invocation: Invocation,
) -> HookResult<Vec<u8>>
where
    I: Serialize + DeserializeOwned,
    O: Serialize + DeserializeOwned,
    F: Fn(HookRequest, OperationBody<I, O>) -> Fut,
    Fut: Future<Output = HookResult<Option<OperationBody<I, O>>>>,
{
    let mut body: OperationBody<I, O> = serde_json::from_slice(&invocation.body)?;

    let counter = inbound_cycle_counter(&invocation)?;
    let forwarded = counter
        .check_and_advance(invocation.recursion_limit)
        .map_err(|err| {
            record_recursion_rejection();
            tracing::warn!(
                op = path,
                hook = %hook,
                counter = counter.value(),
                limit = invocation.recursion_limit,
                "Recursion limit reached, hook not run"
            );
            err
        })?;

    let client_headers = headers_to_object(&invocation.headers);
    body.op = path.to_string();
    body.hook = Some(hook);
    body.set_client_request_headers = client_headers.clone();

    let context = invocation
        .context
        .with_client_headers(client_headers)
        .with_cycle_counter(forwarded);
    let request = HookRequest::new(context, &invocation.client);

    // The body moves into the resolver; keep its encoding for the echo case.
    let echo = serde_json::to_vec(&body)
        .map_err(|err| HookError::internal_with_source("input re-encoding failed", err))?;

    match resolver(request, body).await? {
        None => Ok(echo),
        Some(output) => {
            let encoded = serde_json::to_vec(&output)
                .map_err(|err| HookError::internal_with_source("output encoding failed", err))?;
            Ok(invocation
                .normalizer
                .normalize(hook, &invocation.body, &encoded))
        }
    }
}
