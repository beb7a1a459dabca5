//! # Hermes Server
//!
//! HTTP server that answers the gateway's hook calls.
//!
//! - [`HookRegistry`] - Explicit table of operation, proxy and upload hooks
//! - [`Server`] - hyper HTTP/1 server with request timeouts and graceful shutdown
//! - [`HookRequest`] - What a resolver gets besides its payload
//! - [`InternalClient`] - Calls back into the gateway, forwarding `Wg-Cycle-Counter`
//!
//! ## Routes
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | `POST` | `/operation/{path}/{hook}` | Operation hooks |
//! | `POST` | `/proxy/{name}` | Proxy hooks, RBAC-guarded |
//! | `POST` | `/upload/{provider}/{profile}/{hook}` | Upload hooks |
//! | `GET` | `/health` | Liveness |
//! | `GET` | `/metrics` | Prometheus text, when enabled |
//!
//! ## Example
//!
//! ```rust,no_run
//! use hermes_authz::RbacEnforcer;
//! use hermes_core::{ClientResponse, HookError, Json, MiddlewareHook, OperationBody};
//! use hermes_server::{HookRegistry, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = HookRegistry::new();
//!     registry
//!         .register_operation_hook(
//!             "Users/Update",
//!             MiddlewareHook::MutatingPreResolve,
//!             |_req, body: OperationBody<Json, Json>| async move { Ok::<_, HookError>(Some(body)) },
//!         )
//!         .register_proxy_hook(
//!             "payments/charge",
//!             |_req, _body| async { Ok::<Option<ClientResponse>, HookError>(None) },
//!             Some(RbacEnforcer::builder().require_any(["billing"]).build()),
//!         );
//!
//!     Server::builder().registry(registry).build().run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod handler;
mod health;
mod operation;
mod proxy;
mod registry;
pub mod router;
mod server;
pub mod shutdown;
mod upload;

pub use client::InternalClient;
pub use error::ServerError;
pub use handler::{BoxedHookFuture, ErasedHook, HookKind, HookReply, HookRequest, Invocation};
pub use health::{HealthCheck, HealthStatus};
pub use proxy::PROXY_HOOK;
pub use registry::HookRegistry;
pub use router::{RouteEntry, Router};
pub use server::{HttpResponse, ResponseBody, Server, ServerBuilder, REQUEST_ID_HEADER};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownReceiver, ShutdownSignal};
