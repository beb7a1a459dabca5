//! # Hermes Core
//!
//! Core types shared by every Hermes crate.
//!
//! - [`HookError`] - Error type with HTTP status mapping and JSON envelope
//! - [`HookContext`] - Per-request state handed to resolvers
//! - [`User`] - Principal forwarded by the gateway
//! - [`OperationBody`], [`ProxyHookBody`], [`UploadBody`] - Hook payloads
//! - [`CycleCounter`] - Recursion guard for hook chains

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod cycle;
mod error;
pub mod hook;
mod identity;

pub use context::{headers_to_object, HookContext, RequestHeaders, RequestId};
pub use cycle::{
    check_and_advance, CycleCounter, CYCLE_COUNTER_FIELD, CYCLE_COUNTER_HEADER,
    DEFAULT_RECURSION_LIMIT,
};
pub use error::{ErrorCategory, ErrorDetail, ErrorEnvelope, HookError, HookResult};
pub use hook::{
    ClientRequest, ClientResponse, HookFile, Json, MiddlewareHook, OperationBody,
    OperationBodyResponse, ProxyHookBody, RequestError, UploadBody, UploadError, UploadHook,
    UploadHookResponse, WgContext,
};
pub use identity::User;
