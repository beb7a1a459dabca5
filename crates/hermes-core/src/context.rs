//! Per-request hook context.
//!
//! The [`HookContext`] carries everything a resolver may need besides the
//! payload itself: the request id, the principal, the inbound client headers
//! and the headers to attach when calling back into the gateway.

use crate::cycle::{CycleCounter, CYCLE_COUNTER_HEADER};
use crate::identity::User;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use uuid::Uuid;

/// Header name to value map, first value per name.
pub type RequestHeaders = BTreeMap<String, String>;

/// Collects a header map into [`RequestHeaders`].
///
/// Keeps the first value of each header and renders names in canonical
/// `Content-Type` form. Values that are not visible ASCII are skipped.
pub fn headers_to_object(headers: &http::HeaderMap) -> RequestHeaders {
    let mut obj = RequestHeaders::new();
    for name in headers.keys() {
        let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        obj.entry(canonical_header_name(name.as_str()))
            .or_insert_with(|| value.to_string());
    }
    obj
}

fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log correlation sortable.
///
/// # Example
///
/// ```
/// use hermes_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// State for a single hook invocation.
///
/// # Example
///
/// ```
/// use hermes_core::{CycleCounter, HookContext, User};
///
/// let ctx = HookContext::new()
///     .with_user(User::with_roles("u-1", ["admin"]))
///     .with_cycle_counter(CycleCounter::new(2));
///
/// assert_eq!(ctx.forward_headers()["Wg-Cycle-Counter"], "2");
/// ```
#[derive(Debug, Clone)]
pub struct HookContext {
    request_id: RequestId,
    user: Option<User>,
    client_headers: RequestHeaders,
    cycle_counter: Option<CycleCounter>,
    forward_headers: RequestHeaders,
    started_at: Instant,
}

impl HookContext {
    /// Creates a context with a fresh request id and no principal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            user: None,
            client_headers: RequestHeaders::new(),
            cycle_counter: None,
            forward_headers: RequestHeaders::new(),
            started_at: Instant::now(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns a new context with the specified request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns the principal, if the gateway forwarded one.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Sets the principal.
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    /// Returns a new context with the specified principal.
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    /// Headers of the inbound hook request.
    #[must_use]
    pub const fn client_headers(&self) -> &RequestHeaders {
        &self.client_headers
    }

    /// Returns a new context with the inbound headers.
    #[must_use]
    pub fn with_client_headers(mut self, headers: RequestHeaders) -> Self {
        self.client_headers = headers;
        self
    }

    /// The counter to forward on nested calls, once the guard has run.
    #[must_use]
    pub const fn cycle_counter(&self) -> Option<CycleCounter> {
        self.cycle_counter
    }

    /// Records the advanced counter and the header that forwards it.
    #[must_use]
    pub fn with_cycle_counter(mut self, counter: CycleCounter) -> Self {
        self.cycle_counter = Some(counter);
        self.forward_headers
            .insert(CYCLE_COUNTER_HEADER.to_string(), counter.to_header_value());
        self
    }

    /// Adds a header to attach to every nested gateway call.
    #[must_use]
    pub fn with_forward_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.forward_headers.insert(name.into(), value.into());
        self
    }

    /// Headers to attach to nested gateway calls.
    #[must_use]
    pub const fn forward_headers(&self) -> &RequestHeaders {
        &self.forward_headers
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

impl Default for HookContext {
    fn default() -> Self {
        Self::new()
    }
}
