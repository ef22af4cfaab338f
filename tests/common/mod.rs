//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;

use replay_proxy::config::{parse_config, ConfigFormat};
use replay_proxy::lifecycle::Shutdown;
use replay_proxy::HttpServer;

/// One request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Requests received by a mock backend, in arrival order.
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Wait up to two seconds for at least `count` requests.
    pub async fn wait_for(&self, count: usize) -> Vec<Recorded> {
        for _ in 0..40 {
            if self.len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.requests()
    }
}

/// Start an axum backend that records every request and answers with
/// `status`, `body` and an `x-backend: mock` header.
pub async fn start_recording_backend(
    addr: SocketAddr,
    status: StatusCode,
    body: &'static str,
) -> Recorder {
    start_backend(addr, status, body, Duration::ZERO).await
}

/// Like [`start_recording_backend`] but waits `delay` before answering.
pub async fn start_slow_backend(addr: SocketAddr, delay: Duration) -> Recorder {
    start_backend(addr, StatusCode::OK, "slow", delay).await
}

async fn start_backend(
    addr: SocketAddr,
    status: StatusCode,
    body: &'static str,
    delay: Duration,
) -> Recorder {
    let recorder = Recorder::default();
    let sink = recorder.clone();

    let handler = move |method: Method, uri: Uri, headers: HeaderMap, payload: Bytes| {
        let sink = sink.clone();
        async move {
            sink.inner.lock().unwrap().push(Recorded {
                method,
                uri,
                headers,
                body: payload,
            });
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            (status, [("x-backend", "mock")], body)
        }
    };
    let app = Router::new().fallback(handler);

    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    recorder
}

/// Start the proxy on `addr` with a YAML Proxyfile. Returns the shutdown handle.
pub async fn start_proxy(addr: SocketAddr, proxyfile: &str) -> Shutdown {
    let config = parse_config(proxyfile, ConfigFormat::Yaml).unwrap();
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind(addr).await.unwrap();

    let shutdown = Shutdown::new();
    let stop = shutdown.listener();
    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

/// Client that neither pools connections nor honours proxy env vars.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
