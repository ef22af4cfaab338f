//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the proxy engine from a validated configuration
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID, timeout, panic catching)
//! - Serve on a listener until shutdown is signalled
//!
//! # Middleware Order (outermost first)
//! ```text
//! TraceLayer → SetRequestId → PropagateRequestId → Timeout → CatchPanic → handler
//! ```

use std::any::Any;
use std::backtrace::Backtrace;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request, Response, StatusCode},
    response::IntoResponse,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::loader::ConfigError;
use crate::config::validation::ValidationError;
use crate::config::ProxyConfig;
use crate::error::StartupError;
use crate::http::client::build_client;
use crate::http::engine::ProxyEngine;
use crate::http::forwarder::Forwarder;
use crate::http::request::RequestSnapshot;
use crate::lifecycle::ShutdownListener;
use crate::replay::{ReplayConfig, ReplayDispatcher};
use crate::routing::RouteTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProxyEngine>,
    pub max_body_bytes: usize,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let header = &config.annotations.request_id_header;
        let request_id_header = HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
            ConfigError::Validation(vec![ValidationError::InvalidRequestIdHeader(header.clone())])
        })?;

        let timeouts = &config.spec.server.timeouts;
        let client = build_client(timeouts)?;
        let routes = RouteTable::from_config(config.rules());
        let replay = ReplayConfig::from_config(&config)?;

        tracing::info!(
            hosts = routes.len(),
            replay_enabled = replay.enabled,
            replay_target = %replay.authority(),
            "Proxy engine configured"
        );

        let engine = ProxyEngine::new(
            routes,
            Forwarder::new(client.clone(), Duration::from_secs(timeouts.forward_secs)),
            ReplayDispatcher::new(replay, client),
            request_id_header.clone(),
        );

        let state = AppState {
            engine: Arc::new(engine),
            max_body_bytes: config.spec.server.max_body_bytes,
        };

        let router = Self::build_router(&config, request_id_header, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &ProxyConfig,
        request_id_header: HeaderName,
        state: AppState,
    ) -> Router {
        let timeouts = &config.spec.server.timeouts;
        // Headers must arrive within connect + forward; the body may stream after.
        let request_timeout = Duration::from_secs(timeouts.connect_secs + timeouts.forward_secs);
        let stack_traces = config.annotations.stack_trace_enabled;

        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
                panic_response(panic, stack_traces)
            }))
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
            .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Catch-all handler: capture the request, then hand it to the engine.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response<Body> {
    match RequestSnapshot::capture(request, remote_addr, state.max_body_bytes).await {
        Ok(snapshot) => state.engine.handle(snapshot).await,
        Err(e) => {
            tracing::warn!(remote_addr = %remote_addr, error = %e, "Rejected request body");
            e.into_response()
        }
    }
}

/// 500 for a panicking handler; details are logged only when enabled.
fn panic_response(panic: Box<dyn Any + Send + 'static>, stack_traces: bool) -> Response<Body> {
    if stack_traces {
        let message = panic
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| panic.downcast_ref::<&str>().copied())
            .unwrap_or("unknown panic");
        tracing::error!(
            panic = %message,
            backtrace = %Backtrace::force_capture(),
            "Handler panicked"
        );
    } else {
        tracing::error!("Handler panicked");
    }

    let status = StatusCode::INTERNAL_SERVER_ERROR;
    (status, status.canonical_reason().unwrap_or("Internal Server Error")).into_response()
}
