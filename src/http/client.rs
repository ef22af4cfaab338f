//! Shared outbound HTTP client.
//!
//! One client serves both the forward path and the replay path. It speaks
//! plain http and https (rules with `tls: true`, https replay targets) and
//! keeps idle connections pooled per host.

use std::time::Duration;

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::TimeoutConfig;

/// Type alias for the HTTP client used by the proxy.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Create the shared client.
pub fn build_client(timeouts: &TimeoutConfig) -> Result<HttpClient, rustls::Error> {
    let mut http_connector = HttpConnector::new();
    http_connector.enforce_http(false); // Allow both HTTP and HTTPS
    http_connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

    let https_connector = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    tracing::debug!(connect_timeout_secs = timeouts.connect_secs, "Outbound HTTP client ready");

    Ok(Client::builder(TokioExecutor::new()).build(https_connector))
}
