//! Proxy engine.
//!
//! # Data Flow
//! ```text
//! RequestSnapshot
//!     → normalize host, RouteTable::lookup        (miss → 404)
//!     → HostRoute::match_path                     (miss → 404)
//!     → ReplayDispatcher::dispatch                (detached, never awaited)
//!     → resolve downstream URL, Forwarder::forward (failure → 502/504)
//!     → downstream response relayed
//! ```
//!
//! # Design Decisions
//! - The engine owns immutable state only; one instance serves every request
//! - Replay is scheduled before forwarding so a forward failure still mirrors

use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderName, Response};
use axum::response::IntoResponse;

use crate::error::ProxyError;
use crate::http::forwarder::Forwarder;
use crate::http::request::RequestSnapshot;
use crate::observability::metrics;
use crate::replay::ReplayDispatcher;
use crate::routing::matcher::normalize_host;
use crate::routing::{resolve, RouteTable};

/// Routes, forwards and mirrors captured requests.
pub struct ProxyEngine {
    routes: RouteTable,
    forwarder: Forwarder,
    replay: ReplayDispatcher,
    request_id_header: HeaderName,
}

impl ProxyEngine {
    pub fn new(
        routes: RouteTable,
        forwarder: Forwarder,
        replay: ReplayDispatcher,
        request_id_header: HeaderName,
    ) -> Self {
        Self {
            routes,
            forwarder,
            replay,
            request_id_header,
        }
    }

    /// Serve one captured request.
    pub async fn handle(&self, snapshot: RequestSnapshot) -> Response<Body> {
        let start = Instant::now();
        let request_id = snapshot
            .header_str(&self.request_id_header)
            .map(str::to_string);
        let method = snapshot.method().to_string();

        tracing::debug!(
            request_id = request_id.as_deref().unwrap_or("-"),
            method = %method,
            host = %snapshot.host(),
            path = %snapshot.path(),
            remote_addr = %snapshot.remote_addr(),
            "Proxying request"
        );

        let (label, result) = self.route_and_forward(&snapshot, request_id).await;
        let response = match result {
            Ok(response) => response,
            Err(e) => e.into_response(),
        };

        metrics::record_request(&method, response.status().as_u16(), &label, start);
        response
    }

    /// Returns the host label for metrics alongside the outcome.
    async fn route_and_forward(
        &self,
        snapshot: &RequestSnapshot,
        request_id: Option<String>,
    ) -> (String, Result<Response<Body>, ProxyError>) {
        let host = normalize_host(snapshot.host());

        let Some(route) = self.routes.lookup(&host) else {
            tracing::warn!(host = %host, path = %snapshot.path(), "No route for host");
            return ("none".to_string(), Err(ProxyError::RouteNotFound { host }));
        };

        let Some(rule) = route.match_path(snapshot.path()) else {
            tracing::warn!(host = %host, path = %snapshot.path(), "No path rule matched");
            let path = snapshot.path().to_string();
            return (host.clone(), Err(ProxyError::PathMismatch { host, path }));
        };

        // The handle is dropped, which detaches the task.
        self.replay.dispatch(snapshot, rule, request_id);

        let result = match resolve(rule, snapshot.host(), snapshot.path()) {
            Ok(target) => self.forwarder.forward(snapshot, target).await,
            Err(e) => Err(e),
        };
        (host, result)
    }
}
