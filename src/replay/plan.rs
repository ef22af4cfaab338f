//! Mirrored request construction.
//!
//! Pure functions from a snapshot and the replay configuration to the
//! outbound request. Nothing here touches the network.
//!
//! ```text
//! headers ← snapshot headers minus suppressed names
//! url     ← scheme://host[:port] + (path+query | rewrite path | /)
//! method  ← snapshot method | rewrite method
//! body    ← snapshot body | JSON envelope
//! ```

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Uri};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::http::request::{header_values, RequestSnapshot};
use crate::replay::config::{MethodStrategy, PathStrategy, ReplayConfig};
use crate::replay::dispatcher::ReplayError;

/// JSON document sent instead of the raw body in envelope mode.
#[derive(Debug, Serialize)]
pub struct ReplayEnvelope {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, Vec<String>>,
    /// Base64 of the captured body.
    pub body: String,
    pub remote_ip: String,
}

impl ReplayEnvelope {
    /// `headers` are the already filtered outbound headers.
    pub fn new(snapshot: &RequestSnapshot, headers: &HeaderMap) -> Self {
        Self {
            method: snapshot.method().to_string(),
            path: snapshot.path().to_string(),
            headers: header_values(headers),
            body: STANDARD.encode(snapshot.body_bytes()),
            remote_ip: snapshot.remote_addr().ip().to_string(),
        }
    }
}

/// Target URL of the mirrored request.
pub fn replay_uri(config: &ReplayConfig, snapshot: &RequestSnapshot) -> Result<Uri, ReplayError> {
    let path = match &config.path_strategy {
        PathStrategy::Preserve => snapshot.path_and_query(),
        PathStrategy::Rewrite(path) => path.clone(),
        PathStrategy::Suppress => "/".to_string(),
    };
    let authority = config.authority();

    Uri::builder()
        .scheme(config.scheme.as_str())
        .authority(authority.as_str())
        .path_and_query(path.as_str())
        .build()
        .map_err(|e| {
            ReplayError::InvalidUrl(format!("{}://{}{}: {}", config.scheme, authority, path, e))
        })
}

/// Method of the mirrored request.
pub fn replay_method(config: &ReplayConfig, snapshot: &RequestSnapshot) -> Method {
    match &config.method_strategy {
        MethodStrategy::Preserve => snapshot.method().clone(),
        MethodStrategy::Rewrite(method) => method.clone(),
    }
}

/// Inbound headers with every suppressed name removed (all values) and
/// `Host` pointing at the replay target.
pub fn replay_headers(config: &ReplayConfig, snapshot: &RequestSnapshot) -> HeaderMap {
    let mut headers = snapshot.headers().clone();
    for name in &config.suppressed_headers {
        headers.remove(name);
    }
    // Without a Host header the client derives it from the replay URL.
    headers.remove(header::HOST);
    if let Ok(host) = HeaderValue::from_str(&config.authority()) {
        headers.insert(header::HOST, host);
    }
    headers
}

/// Assemble the complete mirrored request.
pub fn build_replay_request(
    config: &ReplayConfig,
    snapshot: &RequestSnapshot,
) -> Result<Request<Body>, ReplayError> {
    let uri = replay_uri(config, snapshot)?;
    let mut headers = replay_headers(config, snapshot);

    let body = if config.envelope {
        let document = serde_json::to_vec(&ReplayEnvelope::new(snapshot, &headers))
            .map_err(|e| ReplayError::Envelope(e.to_string()))?;
        // The original framing no longer describes the body.
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::TRANSFER_ENCODING);
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Body::from(document)
    } else {
        snapshot.body()
    };

    let mut builder = Request::builder().method(replay_method(config, snapshot)).uri(uri);
    if let Some(slot) = builder.headers_mut() {
        *slot = headers;
    }
    builder
        .body(body)
        .map_err(|e| ReplayError::InvalidUrl(e.to_string()))
}
