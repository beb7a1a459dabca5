//! Upload hooks.
//!
//! `preUpload` and `postUpload` run around a file upload handled by the
//! gateway. Failures are not rendered as error envelopes: the gateway reads
//! `error` out of the [`UploadHookResponse`] and shows it to the client, so
//! both a bad body and a failing resolver answer 500 with that field set.

use std::future::Future;
use std::sync::Arc;

use hermes_core::{HookResult, UploadBody, UploadHook, UploadHookResponse};
use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::handler::{BoxedHookFuture, ErasedHook, HookReply, HookRequest, Invocation};

pub(crate) fn upload_handler<M, F, Fut>(route: String, hook: UploadHook, resolver: F) -> ErasedHook
where
    M: DeserializeOwned + Send + 'static,
    F: Fn(HookRequest, UploadBody<M>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<UploadHookResponse>> + Send + 'static,
{
    let route: Arc<str> = route.into();
    let resolver = Arc::new(resolver);

    Arc::new(move |invocation: Invocation| -> BoxedHookFuture {
        let route = Arc::clone(&route);
        let resolver = Arc::clone(&resolver);
        Box::pin(async move {
            let body: UploadBody<M> = match serde_json::from_slice(&invocation.body) {
                Ok(body) => body,
                Err(err) => return failure(&route, hook, err.to_string()),
            };
            let request = HookRequest::new(invocation.context, &invocation.client);
            match resolver(request, body).await {
                Ok(response) => HookReply::json(StatusCode::OK, &response),
                Err(err) => failure(&route, hook, err.to_string()),
            }
        })
    })
}

fn failure(route: &str, hook: UploadHook, message: String) -> HookReply {
    tracing::error!(route, hook = %hook, error = %message, "Upload hook failed");
    HookReply::json(
        StatusCode::INTERNAL_SERVER_ERROR,
        &UploadHookResponse::error(message),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InternalClient;
    use bytes::Bytes;
    use hermes_core::{HookContext, HookError};
    use hermes_json::Normalizer;
    use http::HeaderMap;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Debug, Deserialize)]
    struct AvatarMeta {
        #[serde(rename = "postId")]
        post_id: String,
    }

    fn invocation(body: &[u8]) -> Invocation {
        Invocation {
            headers: HeaderMap::new(),
            query: None,
            body: Bytes::copy_from_slice(body),
            context: HookContext::new(),
            client: InternalClient::new("http://gw"),
            recursion_limit: 16,
            normalizer: Arc::new(Normalizer::default()),
        }
    }

    fn decode(reply: &HookReply) -> Value {
        serde_json::from_slice(&reply.body).unwrap()
    }

    fn keyed_by_post() -> ErasedHook {
        upload_handler(
            "/upload/s3/avatar/preUpload".into(),
            UploadHook::PreUpload,
            |_req, body: UploadBody<AvatarMeta>| async move {
                let Some(meta) = body.meta else {
                    return Err(HookError::resolver("meta is required"));
                };
                Ok(UploadHookResponse {
                    file_key: Some(format!("{}/{}", meta.post_id, body.file.name)),
                    error: None,
                })
            },
        )
    }

    #[tokio::test]
    async fn test_resolver_output_is_returned() {
        let body = json!({
            "file": {"name": "a.png", "size": 3, "type": "image/png"},
            "meta": {"postId": "p1"}
        });
        let reply = keyed_by_post()(invocation(&serde_json::to_vec(&body).unwrap())).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(decode(&reply), json!({"fileKey": "p1/a.png"}));
    }

    #[tokio::test]
    async fn test_resolver_error_sets_error_field() {
        let reply = keyed_by_post()(invocation(br#"{"file":{"name":"a.png"}}"#)).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(decode(&reply), json!({"error": "meta is required"}));
    }

    #[tokio::test]
    async fn test_bad_body_sets_error_field() {
        let reply = keyed_by_post()(invocation(br#"{"meta":{"postId":7}}"#)).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(decode(&reply)["error"].as_str().is_some_and(|m| !m.is_empty()));
        assert!(decode(&reply).get("fileKey").is_none());
    }
}
