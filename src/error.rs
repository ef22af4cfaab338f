//! Error taxonomy.
//!
//! Every failure on the primary request path resolves to a status code for
//! that one request. Only `StartupError` is process-fatal, and only before
//! the listener accepts traffic.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while serving a single proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No host route is registered for the normalized inbound host.
    #[error("no route registered for host {host}")]
    RouteNotFound { host: String },

    /// The host is known but none of its path rules match.
    #[error("no path rule for {host} matches {path}")]
    PathMismatch { host: String, path: String },

    /// The downstream URL could not be built from the rule and inbound request.
    #[error("invalid downstream url: {0}")]
    InvalidDownstreamUrl(String),

    /// The outbound call failed before a response arrived.
    #[error("downstream unavailable: {0}")]
    DownstreamUnavailable(String),

    /// The outbound call exceeded its deadline.
    #[error("downstream timed out after {0} ms")]
    DownstreamTimeout(u64),

    /// The inbound body exceeded the configured capture limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The inbound body stream failed mid-read.
    #[error("failed to read request body: {0}")]
    BodyRead(String),
}

impl ProxyError {
    /// Status code returned to the original caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::RouteNotFound { .. } | ProxyError::PathMismatch { .. } => {
                StatusCode::NOT_FOUND
            }
            ProxyError::InvalidDownstreamUrl(_) | ProxyError::DownstreamUnavailable(_) => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::DownstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::BodyRead(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason).into_response()
    }
}

/// Failures that prevent the server from being built. Fatal at startup only.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to set up TLS for outbound connections: {0}")]
    Tls(#[from] rustls::Error),
}
