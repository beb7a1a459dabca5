//! Client for calling back into the gateway.
//!
//! Resolvers sometimes need the result of another operation. They get an
//! [`InternalClient`] with every [`HookRequest`](crate::HookRequest) that
//! already carries the forwarded headers of the current call, most
//! importantly `Wg-Cycle-Counter`, so the gateway can stop runaway chains.

use hermes_core::{HookError, HookResult, RequestError, RequestHeaders};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// HTTP client bound to the gateway's internal operations endpoint.
///
/// Cheap to clone; the underlying connection pool is shared.
///
/// ```rust
/// use hermes_server::InternalClient;
///
/// let client = InternalClient::new("http://localhost:9991/");
/// assert_eq!(
///     client.operation_url("/Users/Get"),
///     "http://localhost:9991/operations/Users/Get"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct InternalClient {
    http: reqwest::Client,
    base_url: String,
    headers: RequestHeaders,
}

#[derive(Serialize)]
struct OperationRequest<'a, I: ?Sized> {
    input: &'a I,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "O: DeserializeOwned"))]
struct OperationResult<O> {
    #[serde(default)]
    data: Option<O>,
    #[serde(default)]
    errors: Vec<RequestError>,
}

impl InternalClient {
    /// Creates a client for the gateway at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    /// Creates a client on top of an existing `reqwest` client.
    #[must_use]
    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: RequestHeaders::new(),
        }
    }

    /// Returns a copy that also sends `headers`. Later values win.
    #[must_use]
    pub fn with_headers(&self, headers: &RequestHeaders) -> Self {
        let mut client = self.clone();
        client
            .headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        client
    }

    /// Headers attached to every call.
    #[must_use]
    pub fn headers(&self) -> &RequestHeaders {
        &self.headers
    }

    /// The gateway base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint of the operation `name`.
    #[must_use]
    pub fn operation_url(&self, name: &str) -> String {
        format!("{}/operations/{}", self.base_url, name.trim_start_matches('/'))
    }

    /// Runs an operation on the gateway and returns its `data`.
    ///
    /// A non-success status or a non-empty `errors` list is reported as a
    /// resolver failure carrying the gateway's message. Transport errors are
    /// internal errors.
    pub async fn execute<I, O>(&self, name: &str, input: &I) -> HookResult<Option<O>>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let url = self.operation_url(name);
        let mut request = self.http.post(&url).json(&OperationRequest { input });
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        tracing::debug!(operation = name, url = %url, "Calling gateway operation");
        let response = request
            .send()
            .await
            .map_err(|err| HookError::internal_with_source("gateway request failed", err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HookError::resolver(format!(
                "operation {name} failed with status {status}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| HookError::internal_with_source("gateway response unreadable", err))?;
        let result: OperationResult<O> = serde_json::from_slice(&body).map_err(|err| {
            HookError::resolver(format!("operation {name} returned invalid JSON: {err}"))
        })?;

        if let Some(first) = result.errors.first() {
            return Err(HookError::resolver(first.message.clone()));
        }
        Ok(result.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{ErrorCategory, CYCLE_COUNTER_HEADER};

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = InternalClient::new("http://gw:9991///");
        assert_eq!(client.base_url(), "http://gw:9991");
        assert_eq!(client.operation_url("Todos/List"), "http://gw:9991/operations/Todos/List");
    }

    #[test]
    fn test_with_headers_merges() {
        let base = InternalClient::new("http://gw");
        let mut first = RequestHeaders::new();
        first.insert(CYCLE_COUNTER_HEADER.to_string(), "1".to_string());
        first.insert("X-Trace".to_string(), "a".to_string());
        let mut second = RequestHeaders::new();
        second.insert(CYCLE_COUNTER_HEADER.to_string(), "2".to_string());

        let client = base.with_headers(&first).with_headers(&second);
        assert_eq!(client.headers()[CYCLE_COUNTER_HEADER], "2");
        assert_eq!(client.headers()["X-Trace"], "a");
        assert!(base.headers().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_internal_error() {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let client = InternalClient::with_http_client(http, "http://127.0.0.1:1");
        let err = client
            .execute::<_, serde_json::Value>("Users/Get", &serde_json::json!({"id": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Internal);
    }

    #[tokio::test]
    async fn test_execute_accepts_unsized_input() {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let client = InternalClient::with_http_client(http, "http://127.0.0.1:1");
        let ids: &[u32] = &[1, 2, 3];
        let err = client
            .execute::<[u32], serde_json::Value>("Users/ByIds", ids)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_result_shape() {
        let parsed: OperationResult<serde_json::Value> =
            serde_json::from_str(r#"{"errors":[{"message":"boom"}]}"#).unwrap();
        assert!(parsed.data.is_none());
        assert_eq!(parsed.errors[0].message, "boom");
    }
}
