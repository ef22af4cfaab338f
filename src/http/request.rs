//! Inbound request capture.
//!
//! # Responsibilities
//! - Read the one-shot inbound body exactly once, up to a size limit
//! - Record method, host, path, query, headers and remote address
//! - Hand out independent views of the body to every consumer
//!
//! # Design Decisions
//! - The snapshot is a value: cloning it is cheap (`Bytes` is refcounted)
//!   and the clone handed to the replay path never shares a stream with
//!   the forward path
//! - Oversized bodies are rejected with 413 before anything is forwarded

use std::collections::BTreeMap;
use std::io::Cursor;
use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, request::Parts, HeaderMap, HeaderName, Method, Request};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::error::ProxyError;

/// Immutable copy of an inbound request.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    method: Method,
    host: String,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: SocketAddr,
}

impl RequestSnapshot {
    /// Consume the inbound request, reading the whole body (at most `limit` bytes).
    pub async fn capture(
        request: Request<Body>,
        remote_addr: SocketAddr,
        limit: usize,
    ) -> Result<Self, ProxyError> {
        let (parts, body) = request.into_parts();

        let body = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                return Err(ProxyError::PayloadTooLarge { limit });
            }
            Err(e) => return Err(ProxyError::BodyRead(e.to_string())),
        };

        Ok(Self::from_parts(&parts, body, remote_addr))
    }

    /// Build a snapshot from request parts and an already read body.
    pub fn from_parts(parts: &Parts, body: Bytes, remote_addr: SocketAddr) -> Self {
        // HTTP/2 carries the host in the :authority pseudo-header, exposed via the URI.
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Self {
            method: parts.method.clone(),
            host,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers.clone(),
            body,
            remote_addr,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Inbound host as received (may carry a port).
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Path plus `?query` when a query was present.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if it is valid UTF-8.
    pub fn header_str(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Headers as name → values, preserving value order per name.
    pub fn header_values(&self) -> BTreeMap<String, Vec<String>> {
        header_values(&self.headers)
    }

    /// The captured body bytes.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// A fresh reader over the captured body. Every call starts at byte zero.
    pub fn body_reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.body.clone())
    }

    /// A fresh outbound body carrying the captured bytes.
    pub fn body(&self) -> Body {
        if self.body.is_empty() {
            Body::empty()
        } else {
            Body::from(self.body.clone())
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}

/// Flatten a header map into name → values, lossily decoding non-UTF-8 values.
pub fn header_values(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        map.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}
