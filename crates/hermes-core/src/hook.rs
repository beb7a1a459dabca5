//! Wire payloads exchanged with the gateway.
//!
//! Every hook call is a `POST` with a JSON body. Operation hooks receive an
//! [`OperationBody`], proxy hooks a [`ProxyHookBody`] and upload hooks an
//! [`UploadBody`]. Field names follow the gateway's camelCase convention.

use crate::context::RequestHeaders;
use crate::identity::User;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Untyped JSON object, used where the resolver works without a schema.
pub type Json = serde_json::Map<String, serde_json::Value>;

/// Lifecycle phase of an operation hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MiddlewareHook {
    /// Replaces the operation with a mock result.
    MockResolve,
    /// Runs before the operation; observes the input.
    PreResolve,
    /// Runs after the operation; observes the response.
    PostResolve,
    /// Runs before the operation and may rewrite the input.
    MutatingPreResolve,
    /// Runs after the operation and may rewrite the response.
    MutatingPostResolve,
    /// Replaces the operation's resolver entirely.
    CustomResolve,
}

impl MiddlewareHook {
    /// All hook kinds, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::MockResolve,
        Self::PreResolve,
        Self::PostResolve,
        Self::MutatingPreResolve,
        Self::MutatingPostResolve,
        Self::CustomResolve,
    ];

    /// The name used in routes and payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MockResolve => "mockResolve",
            Self::PreResolve => "preResolve",
            Self::PostResolve => "postResolve",
            Self::MutatingPreResolve => "mutatingPreResolve",
            Self::MutatingPostResolve => "mutatingPostResolve",
            Self::CustomResolve => "customResolve",
        }
    }
}

impl std::fmt::Display for MiddlewareHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MiddlewareHook {
    type Err = UnknownHook;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|hook| hook.as_str() == s)
            .ok_or_else(|| UnknownHook(s.to_string()))
    }
}

/// Phase of an upload hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadHook {
    /// Runs before the file is stored.
    PreUpload,
    /// Runs after the file is stored, or after the upload failed.
    PostUpload,
}

impl UploadHook {
    /// The name used in routes.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreUpload => "preUpload",
            Self::PostUpload => "postUpload",
        }
    }
}

impl std::fmt::Display for UploadHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadHook {
    type Err = UnknownHook;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preUpload" => Ok(Self::PreUpload),
            "postUpload" => Ok(Self::PostUpload),
            other => Err(UnknownHook(other.to_string())),
        }
    }
}

/// Returned when a hook name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hook: {0}")]
pub struct UnknownHook(pub String);

/// An error entry in an operation response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestError {
    /// Error message.
    pub message: String,
    /// Path into the response data, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,
}

impl RequestError {
    /// Creates an error entry with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }
}

/// The `response` part of an operation hook payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(serialize = "O: Serialize", deserialize = "O: DeserializeOwned"))]
pub struct OperationBodyResponse<O> {
    /// Untyped override for `data`, promoted after `mutatingPostResolve`.
    /// An empty object is not sent, so it never replaces `data`.
    #[serde(default, skip_serializing_if = "is_absent_or_empty")]
    pub data_any: Option<Json>,
    /// Typed response data.
    #[serde(default)]
    pub data: Option<O>,
    /// Errors reported by the operation.
    #[serde(default)]
    pub errors: Vec<RequestError>,
}

fn is_absent_or_empty(value: &Option<Json>) -> bool {
    value.as_ref().map_or(true, Json::is_empty)
}

impl<O> Default for OperationBodyResponse<O> {
    fn default() -> Self {
        Self {
            data_any: None,
            data: None,
            errors: Vec::new(),
        }
    }
}

/// Payload of an operation hook call.
///
/// `I` is the operation's input type and `O` the type of `response.data`.
/// Use [`Json`] for both when the resolver works without a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(
    serialize = "I: Serialize, O: Serialize",
    deserialize = "I: DeserializeOwned, O: DeserializeOwned"
))]
pub struct OperationBody<I, O> {
    /// Set by a resolver to cancel the operation.
    #[serde(default)]
    pub canceled: bool,
    /// Operation path; overwritten from the route.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub op: String,
    /// Hook kind; overwritten from the route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<MiddlewareHook>,
    /// Operation input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<I>,
    /// Operation response, absent before resolution.
    #[serde(default)]
    pub response: Option<OperationBodyResponse<O>>,
    /// Headers of the inbound request, made available to the resolver.
    #[serde(default, skip_serializing_if = "RequestHeaders::is_empty")]
    pub set_client_request_headers: RequestHeaders,
}

impl<I, O> Default for OperationBody<I, O> {
    fn default() -> Self {
        Self {
            canceled: false,
            op: String::new(),
            hook: None,
            input: None,
            response: None,
            set_client_request_headers: RequestHeaders::new(),
        }
    }
}

impl<I, O> OperationBody<I, O> {
    /// Replaces the response with an empty one, optionally carrying `data`.
    pub fn reset_response(&mut self, data: Option<O>) {
        self.response = Some(OperationBodyResponse {
            data,
            ..OperationBodyResponse::default()
        });
    }

    /// Returns the response, creating an empty one if needed.
    pub fn response_mut(&mut self) -> &mut OperationBodyResponse<O> {
        self.response.get_or_insert_with(OperationBodyResponse::default)
    }
}

/// The original client request as seen by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    /// HTTP method.
    #[serde(default)]
    pub method: String,
    /// Request URI.
    #[serde(default, rename = "requestURI")]
    pub request_uri: String,
    /// Request headers.
    #[serde(default)]
    pub headers: RequestHeaders,
    /// Raw request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// Gateway metadata attached to every proxy and upload hook call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WgContext {
    /// The client request that triggered the hook.
    #[serde(default)]
    pub client_request: Option<ClientRequest>,
    /// The authenticated principal, if any.
    #[serde(default)]
    pub user: Option<User>,
}

/// Payload of a proxy hook call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyHookBody {
    /// Operation name, echoed back as `op`.
    #[serde(default)]
    pub name: String,
    /// Gateway metadata.
    #[serde(default, rename = "__wg")]
    pub wg: WgContext,
    /// All other fields, untouched.
    #[serde(flatten)]
    pub extra: Json,
}

/// Result a proxy resolver hands back to the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    /// The request to forward.
    #[serde(default)]
    pub request: ClientRequest,
    /// Status text.
    #[serde(default)]
    pub status: String,
    /// Status code.
    #[serde(default)]
    pub status_code: u16,
}

/// Metadata of an uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookFile {
    /// File name.
    #[serde(default)]
    pub name: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// MIME type.
    #[serde(default, rename = "type")]
    pub content_type: String,
}

/// Error reported by the gateway for a failed upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadError {
    /// Error name.
    #[serde(default)]
    pub name: String,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

/// Payload of an upload hook call, generic over the profile's metadata type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "M: Serialize", deserialize = "M: DeserializeOwned"))]
pub struct UploadBody<M> {
    /// The uploaded file.
    #[serde(default)]
    pub file: HookFile,
    /// Profile metadata supplied by the client.
    #[serde(default)]
    pub meta: Option<M>,
    /// Upload error, set on `postUpload` after a failure.
    #[serde(default)]
    pub error: UploadError,
}

/// Response of an upload hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadHookResponse {
    /// Storage key chosen by the resolver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_key: Option<String>,
    /// Error message, set when the hook failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadHookResponse {
    /// A response carrying only an error.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            file_key: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hook_names_roundtrip() {
        for hook in MiddlewareHook::ALL {
            assert_eq!(hook.as_str().parse::<MiddlewareHook>().unwrap(), hook);
            assert_eq!(
                serde_json::to_value(hook).unwrap(),
                serde_json::Value::String(hook.to_string())
            );
        }
        assert!("onResolve".parse::<MiddlewareHook>().is_err());
    }

    #[test]
    fn test_upload_hook_names() {
        assert_eq!("preUpload".parse::<UploadHook>().unwrap(), UploadHook::PreUpload);
        assert_eq!(UploadHook::PostUpload.to_string(), "postUpload");
        assert!("upload".parse::<UploadHook>().is_err());
    }

    #[test]
    fn test_operation_body_deserializes_gateway_payload() {
        let body: OperationBody<Json, Json> = serde_json::from_value(json!({
            "op": "Users/Get",
            "hook": "mutatingPreResolve",
            "input": {"id": 1},
            "response": {"data": {"name": "x"}, "errors": []}
        }))
        .unwrap();

        assert_eq!(body.hook, Some(MiddlewareHook::MutatingPreResolve));
        assert_eq!(body.input.unwrap()["id"], 1);
        assert_eq!(body.response.unwrap().data.unwrap()["name"], "x");
    }

    #[test]
    fn test_operation_body_serialization_omits_empty_fields() {
        let body: OperationBody<Json, Json> = OperationBody::default();
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, json!({"canceled": false, "response": null}));
    }

    #[test]
    fn test_reset_response() {
        let mut body: OperationBody<Json, String> = OperationBody::default();
        body.reset_response(Some("done".to_string()));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["response"], json!({"data": "done", "errors": []}));
    }

    #[test]
    fn test_empty_data_any_is_not_serialized() {
        let mut response: OperationBodyResponse<Json> = OperationBodyResponse::default();
        response.data_any = Some(Json::new());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"data": null, "errors": []})
        );

        response.data_any = Some(json!({"a": 1}).as_object().cloned().unwrap());
        assert_eq!(serde_json::to_value(&response).unwrap()["dataAny"], json!({"a": 1}));
    }

    #[test]
    fn test_proxy_body_keeps_unknown_fields() {
        let body: ProxyHookBody = serde_json::from_value(json!({
            "name": "stripe",
            "__wg": {"user": {"userId": "1", "roles": ["admin"]}},
            "request": {"method": "GET"}
        }))
        .unwrap();

        assert_eq!(body.name, "stripe");
        assert!(body.wg.user.unwrap().has_role("admin"));
        assert_eq!(body.extra["request"]["method"], "GET");
    }

    #[test]
    fn test_client_request_uri_field_name() {
        let req: ClientRequest =
            serde_json::from_value(json!({"method": "POST", "requestURI": "/x"})).unwrap();
        assert_eq!(req.request_uri, "/x");
    }

    #[test]
    fn test_upload_body_and_response() {
        let body: UploadBody<Json> = serde_json::from_value(json!({
            "file": {"name": "a.png", "size": 10, "type": "image/png"},
            "meta": {"postId": 3},
            "error": {"name": "", "message": ""}
        }))
        .unwrap();
        assert_eq!(body.file.content_type, "image/png");
        assert_eq!(body.meta.unwrap()["postId"], 3);

        let resp = UploadHookResponse::error("too large");
        assert_eq!(serde_json::to_value(resp).unwrap(), json!({"error": "too large"}));
    }
}
