//! The hook server.
//!
//! One hyper HTTP/1 connection task per client. Each request is either a
//! built-in endpoint (`GET /health`, `GET /metrics`) or a `POST` to a
//! registered hook route. Body collection and hook execution are each
//! bounded by the request timeout.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use hermes_authz::RbacEnforcer;
use hermes_config::HermesConfig;
use hermes_core::{HookContext, HookError, RequestId, DEFAULT_RECURSION_LIMIT};
use hermes_json::Normalizer;
use hermes_telemetry::{record_hook_request, render_metrics, InFlightGuard};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use crate::client::InternalClient;
use crate::error::ServerError;
use crate::handler::{HookReply, Invocation};
use crate::health::HealthCheck;
use crate::registry::HookRegistry;
use crate::router::Router;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Body type of every response.
pub type ResponseBody = Full<Bytes>;

/// Response type produced by the server.
pub type HttpResponse = Response<ResponseBody>;

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A frozen hook table plus the HTTP plumbing around it.
///
/// # Example
///
/// ```rust,no_run
/// use hermes_core::{HookError, Json, MiddlewareHook, OperationBody};
/// use hermes_server::{HookRegistry, Server};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut registry = HookRegistry::new();
/// registry.register_operation_hook(
///     "Users/Get",
///     MiddlewareHook::PreResolve,
///     |_req, _body: OperationBody<Json, Json>| async { Ok::<_, HookError>(None) },
/// );
///
/// let server = Server::builder()
///     .http_addr("127.0.0.1:9992")
///     .registry(registry)
///     .build();
/// server.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    recursion_limit: u32,
    metrics_enabled: bool,
    router: Router,
    client: InternalClient,
    normalizer: Arc<Normalizer>,
    health: HealthCheck,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("http_addr", &self.http_addr)
            .field("routes", &self.router.route_count())
            .field("recursion_limit", &self.recursion_limit)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Starts a builder with default settings.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Configured listen address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Upper bound for body collection and for hook execution.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Ceiling for the cycle counter.
    #[must_use]
    pub fn recursion_limit(&self) -> u32 {
        self.recursion_limit
    }

    /// The hook route table.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Runs until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and runs until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr = self.http_addr.parse().map_err(|e| {
            ServerError::BindError(format!("Invalid address '{}': {}", self.http_addr, e))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serves hook calls on an already bound listener until `shutdown` fires.
    ///
    /// In-flight calls get up to the shutdown timeout to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's address cannot be read.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local = listener
            .local_addr()
            .map_err(|e| ServerError::IoError(e.to_string()))?;
        tracing::info!(
            addr = %local,
            hooks = self.router.route_count(),
            "Hook server listening"
        );

        let shutdown_timeout = self.shutdown_timeout;
        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, remote, shutdown).await {
                                tracing::debug!(remote = %remote, error = %e, "Connection closed with error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting hook calls");
                    break;
                }
            }
        }

        tokio::select! {
            () = tracker.wait_for_shutdown() => tracing::info!("All connections closed"),
            () = tokio::time::sleep(shutdown_timeout) => tracing::warn!(
                active = tracker.active_connections(),
                "Shutdown timeout reached with connections still open"
            ),
        }
        tracing::info!("Hook server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let server = Arc::clone(self);
        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                tracing::debug!(remote = %remote, "Draining connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    /// Answers one request. Used by the connection loop and usable directly
    /// in tests without opening a socket.
    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes>,
        B::Error: Display,
    {
        let request_id = RequestId::new();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match (&method, path.as_str()) {
            (&Method::GET, "/health") => {
                let status = self.health.status(self.router.route_count());
                return respond(HookReply::json(StatusCode::OK, &status), &request_id);
            }
            (&Method::GET, "/metrics") => return self.handle_metrics(),
            _ => {}
        }

        let Some(entry) = self.router.match_route(&method, &path) else {
            return self.handle_unrouted(&method, &path, &request_id);
        };
        let (kind, hook, handler) = (entry.kind, entry.hook, Arc::clone(&entry.handler));

        let span = tracing::info_span!(
            "hook",
            kind = %kind,
            hook,
            path = %path,
            request_id = %request_id
        );

        async move {
            let started = Instant::now();
            let _in_flight = InFlightGuard::new();

            let (parts, body) = req.into_parts();
            let body = match tokio::time::timeout(self.request_timeout, body.collect()).await {
                Ok(Ok(collected)) => collected.to_bytes(),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Failed to read hook body");
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        "BODY_READ_ERROR",
                        &format!("Failed to read request body: {e}"),
                        &request_id,
                    );
                }
                Err(_) => {
                    tracing::warn!("Hook body collection timed out");
                    return error_response(
                        StatusCode::REQUEST_TIMEOUT,
                        "REQUEST_TIMEOUT",
                        "Request body collection timed out",
                        &request_id,
                    );
                }
            };

            let invocation = Invocation {
                headers: parts.headers,
                query: parts.uri.query().map(str::to_string),
                body,
                context: HookContext::new().with_request_id(request_id),
                client: self.client.clone(),
                recursion_limit: self.recursion_limit,
                normalizer: Arc::clone(&self.normalizer),
            };

            let reply = match tokio::time::timeout(self.request_timeout, handler(invocation)).await {
                Ok(reply) => reply,
                Err(_) => {
                    tracing::warn!("Hook execution timed out");
                    return error_response(
                        StatusCode::GATEWAY_TIMEOUT,
                        "HANDLER_TIMEOUT",
                        "Hook execution timed out",
                        &request_id,
                    );
                }
            };

            let elapsed = started.elapsed();
            record_hook_request(kind.as_str(), hook, reply.status.as_u16(), elapsed);
            tracing::debug!(
                status = reply.status.as_u16(),
                duration_ms = elapsed.as_millis() as u64,
                "Hook call finished"
            );
            respond(reply, &request_id)
        }
        .instrument(span)
        .await
    }

    fn handle_metrics(&self) -> HttpResponse {
        match render_metrics().filter(|_| self.metrics_enabled) {
            Some(text) => Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(text)))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::new()))),
            None => error_response(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Metrics are disabled",
                &RequestId::new(),
            ),
        }
    }

    fn handle_unrouted(&self, method: &Method, path: &str, request_id: &RequestId) -> HttpResponse {
        if self.router.has_route(path) {
            return error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_ALLOWED",
                &format!("{method} is not allowed on hook routes"),
                request_id,
            );
        }
        tracing::debug!(method = %method, path, "No hook registered");
        let error = HookError::not_found(format!("no hook registered for {path}"));
        respond(HookReply::error(&error, Some(&request_id.to_string())), request_id)
    }
}

fn respond(reply: HookReply, request_id: &RequestId) -> HttpResponse {
    Response::builder()
        .status(reply.status)
        .header("Content-Type", "application/json")
        .header(REQUEST_ID_HEADER, request_id.to_string())
        .body(Full::new(reply.body))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn error_response(status: StatusCode, code: &str, message: &str, request_id: &RequestId) -> HttpResponse {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message,
        },
        "request_id": request_id.to_string(),
    });
    respond(HookReply::json(status, &body), request_id)
}

/// Builder for [`Server`].
pub struct ServerBuilder {
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    recursion_limit: u32,
    gateway_url: String,
    http_client: Option<reqwest::Client>,
    service_name: String,
    metrics_enabled: bool,
    normalizer: Normalizer,
    registry: HookRegistry,
    proxy_policies: BTreeMap<String, RbacEnforcer>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("http_addr", &self.http_addr)
            .field("gateway_url", &self.gateway_url)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl ServerBuilder {
    /// Defaults matching an empty configuration file.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: "0.0.0.0:9992".to_string(),
            shutdown_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            gateway_url: "http://localhost:9991".to_string(),
            http_client: None,
            service_name: "hermes-hooks".to_string(),
            metrics_enabled: false,
            normalizer: Normalizer::default(),
            registry: HookRegistry::new(),
            proxy_policies: BTreeMap::new(),
        }
    }

    /// Takes every setting from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or one of its
    /// proxy policies cannot be built.
    pub fn from_config(config: &HermesConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let mut builder = Self::new()
            .http_addr(config.server.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
            .request_timeout(Duration::from_millis(config.server.request_timeout_ms))
            .recursion_limit(config.hooks.max_recursion_depth)
            .gateway_url(config.hooks.gateway_url.clone())
            .service_name(config.telemetry.service_name.clone())
            .metrics_enabled(config.telemetry.metrics.enabled);

        for name in config.proxies.keys() {
            if let Some(enforcer) = config.proxy_policy(name)? {
                builder = builder.proxy_policy(name.clone(), enforcer);
            }
        }
        Ok(builder)
    }

    /// Listen address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// How long shutdown waits for open connections.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Bound for body collection and for hook execution, each.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Ceiling for the cycle counter.
    #[must_use]
    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Base URL resolvers use to call gateway operations.
    #[must_use]
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    /// Reuses an existing `reqwest` client for gateway calls.
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Service name reported by `/health`.
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Serves `/metrics` from the installed Prometheus recorder.
    #[must_use]
    pub fn metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Replaces the output rewrites of operation hooks.
    #[must_use]
    pub fn normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// The hooks to serve.
    #[must_use]
    pub fn registry(mut self, registry: HookRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Policy for a proxy registered without one.
    #[must_use]
    pub fn proxy_policy(mut self, name: impl Into<String>, enforcer: RbacEnforcer) -> Self {
        self.proxy_policies.insert(name.into(), enforcer);
        self
    }

    /// Freezes the registry and builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        let client = match self.http_client {
            Some(http) => InternalClient::with_http_client(http, self.gateway_url),
            None => InternalClient::new(self.gateway_url),
        };
        Server {
            http_addr: self.http_addr,
            shutdown_timeout: self.shutdown_timeout,
            request_timeout: self.request_timeout,
            recursion_limit: self.recursion_limit,
            metrics_enabled: self.metrics_enabled,
            router: self.registry.into_router(&self.proxy_policies),
            client,
            normalizer: Arc::new(self.normalizer),
            health: HealthCheck::new(self.service_name, env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
