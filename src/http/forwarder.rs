//! Forwarding to the downstream.
//!
//! # Responsibilities
//! - Build the outbound request from a snapshot and a resolved URL
//! - Execute it on the shared client under the forward deadline
//! - Relay the downstream response without buffering it
//!
//! # Design Decisions
//! - Method and every inbound header are forwarded unchanged
//! - The captured body is attached only when non-empty
//! - The response body is streamed straight back to the caller

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, Uri};

use crate::error::ProxyError;
use crate::http::client::HttpClient;
use crate::http::request::RequestSnapshot;
use crate::resilience::{with_deadline, Bounded};
use crate::routing::resolver::with_query;

/// Sends snapshots to their resolved downstream.
#[derive(Clone)]
pub struct Forwarder {
    client: HttpClient,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(client: HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Forward `snapshot` to `target` and return the downstream response.
    pub async fn forward(
        &self,
        snapshot: &RequestSnapshot,
        target: Uri,
    ) -> Result<Response<Body>, ProxyError> {
        let target = with_query(target, snapshot.query())?;
        let request = build_request(snapshot, target.clone())?;

        tracing::info!(method = %snapshot.method(), url = %target, "Sending HTTP request");

        match with_deadline(self.timeout, self.client.request(request)).await {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                Ok(Response::from_parts(parts, Body::new(body)))
            }
            Err(Bounded::Elapsed(deadline)) => {
                tracing::error!(
                    url = %target,
                    timeout_ms = deadline.as_millis() as u64,
                    "Downstream timed out"
                );
                Err(ProxyError::DownstreamTimeout(deadline.as_millis() as u64))
            }
            Err(Bounded::Inner(e)) => {
                tracing::error!(url = %target, error = ?e, "Downstream request failed");
                Err(ProxyError::DownstreamUnavailable(e.to_string()))
            }
        }
    }
}

/// Outbound request: same method and headers, new URL, captured body.
fn build_request(snapshot: &RequestSnapshot, target: Uri) -> Result<Request<Body>, ProxyError> {
    let mut builder = Request::builder().method(snapshot.method().clone()).uri(target);
    if let Some(headers) = builder.headers_mut() {
        *headers = snapshot.headers().clone();
    }
    builder
        .body(snapshot.body())
        .map_err(|e| ProxyError::InvalidDownstreamUrl(e.to_string()))
}
