//! Downstream URL construction.
//!
//! Turns a matched rule plus the inbound host and path into the URL the
//! request is forwarded to:
//!
//! ```text
//! scheme    ← https if rule.use_tls else http (any inbound scheme is dropped)
//! authority ← inbound host without port, plus :target_port when configured
//! path      ← inbound path, verbatim (prefix rules do not strip the prefix)
//! ```

use axum::http::uri::{PathAndQuery, Uri};

use crate::error::ProxyError;
use crate::routing::matcher::{strip_port, strip_scheme, PathRule};

/// Resolve the downstream URL for a request matched by `rule`.
pub fn resolve(rule: &PathRule, inbound_host: &str, inbound_path: &str) -> Result<Uri, ProxyError> {
    let host = strip_port(authority_of(strip_scheme(inbound_host.trim())));

    if !rule.matches(inbound_path) {
        tracing::warn!(
            host = %host,
            path = %inbound_path,
            rule = %rule.match_path,
            "Mismatched route"
        );
        return Err(ProxyError::PathMismatch {
            host: host.to_string(),
            path: inbound_path.to_string(),
        });
    }

    let authority = match rule.target_port {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Uri::builder()
        .scheme(rule.scheme())
        .authority(authority.as_str())
        .path_and_query(inbound_path)
        .build()
        .map_err(|e| {
            ProxyError::InvalidDownstreamUrl(format!(
                "{}://{}{}: {}",
                rule.scheme(),
                authority,
                inbound_path,
                e
            ))
        })
}

/// Attach a raw query string to an already resolved URL.
pub fn with_query(uri: Uri, query: Option<&str>) -> Result<Uri, ProxyError> {
    let query = match query {
        Some(q) if !q.is_empty() => q,
        _ => return Ok(uri),
    };

    let mut parts = uri.into_parts();
    let path = parts
        .path_and_query
        .as_ref()
        .map(|pq| pq.path().to_string())
        .unwrap_or_else(|| "/".to_string());
    let path_and_query = PathAndQuery::try_from(format!("{path}?{query}"))
        .map_err(|e| ProxyError::InvalidDownstreamUrl(e.to_string()))?;
    parts.path_and_query = Some(path_and_query);

    Uri::from_parts(parts).map_err(|e| ProxyError::InvalidDownstreamUrl(e.to_string()))
}

/// Authority portion of a host string that may carry a trailing path.
fn authority_of(host: &str) -> &str {
    match host.find('/') {
        Some(end) => &host[..end],
        None => host,
    }
}
