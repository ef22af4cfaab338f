//! End-to-end routing, forwarding and replay tests.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::http::StatusCode;

mod common;

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Proxyfile routing 127.0.0.1 to `backend_port` and mirroring to `replay_port`.
fn proxyfile(backend_port: u16, replay_port: u16, replay_extra: &str) -> String {
    format!(
        r#"
annotations:
  proxy.conf/replay-requests-enabled: true
spec:
  server:
    timeouts:
      forwardSecs: 2
      replaySecs: 2
    replay:
      host: 127.0.0.1
      port: {replay_port}
      suppressedHeaders:
        - name: Authorization
{replay_extra}
  rules:
    - host: 127.0.0.1
      paths:
        - path: /orders
          pathType: Prefix
          portNumber: {backend_port}
          enableReplay: true
        - path: /quiet
          pathType: Exact
          portNumber: {backend_port}
"#
    )
}

#[tokio::test]
async fn test_unknown_host_is_not_found() {
    let backend = common::start_recording_backend(addr(28201), StatusCode::OK, "ok").await;
    let replay = common::start_recording_backend(addr(28202), StatusCode::OK, "").await;
    let _shutdown = common::start_proxy(addr(28203), &proxyfile(28201, 28202, "")).await;

    let res = common::client()
        .get("http://127.0.0.1:28203/orders/1")
        .header("host", "unknown.local")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 404);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.len(), 0, "No downstream call for an unknown host");
    assert_eq!(replay.len(), 0, "No replay for an unknown host");
}

#[tokio::test]
async fn test_path_mismatch_is_not_found() {
    let backend = common::start_recording_backend(addr(28204), StatusCode::OK, "ok").await;
    let _shutdown = common::start_proxy(addr(28206), &proxyfile(28204, 28205, "")).await;

    let res = common::client()
        .get("http://127.0.0.1:28206/quiet/extra")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 404);
    assert_eq!(backend.len(), 0);
}

#[tokio::test]
async fn test_forward_relays_response() {
    let backend =
        common::start_recording_backend(addr(28207), StatusCode::CREATED, "created").await;
    let _shutdown = common::start_proxy(addr(28209), &proxyfile(28207, 28208, "")).await;

    let res = common::client()
        .post("http://127.0.0.1:28209/orders/42?expand=items")
        .header("authorization", "Bearer token")
        .header("x-custom", "kept")
        .body("{\"qty\":3}")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 201);
    assert_eq!(res.headers().get("x-backend").unwrap(), "mock");
    assert!(res.headers().get("x-request-id").is_some(), "Request id on every response");
    assert_eq!(res.text().await.unwrap(), "created");

    let seen = backend.wait_for(1).await;
    assert_eq!(seen.len(), 1);
    let request = &seen[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.uri.path(), "/orders/42");
    assert_eq!(request.uri.query(), Some("expand=items"));
    assert_eq!(request.headers.get("authorization").unwrap(), "Bearer token");
    assert_eq!(request.headers.get("x-custom").unwrap(), "kept");
    assert!(request.headers.get("x-request-id").is_some());
    assert_eq!(request.body.as_ref(), b"{\"qty\":3}");
}

#[tokio::test]
async fn test_downstream_failure_is_bad_gateway() {
    // Nothing listens on 28210.
    let _shutdown = common::start_proxy(addr(28212), &proxyfile(28210, 28211, "")).await;

    let res = common::client()
        .get("http://127.0.0.1:28212/quiet")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 502);
}

#[tokio::test]
async fn test_slow_downstream_times_out() {
    let _backend = common::start_slow_backend(addr(28213), Duration::from_secs(5)).await;
    let _shutdown = common::start_proxy(addr(28215), &proxyfile(28213, 28214, "")).await;

    let res = common::client()
        .get("http://127.0.0.1:28215/quiet")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 504);
}

#[tokio::test]
async fn test_replay_mirrors_request_without_suppressed_headers() {
    let backend = common::start_recording_backend(addr(28216), StatusCode::OK, "primary").await;
    let replay = common::start_recording_backend(addr(28217), StatusCode::OK, "").await;
    let _shutdown = common::start_proxy(addr(28218), &proxyfile(28216, 28217, "")).await;

    let payload = "x".repeat(64 * 1024);
    let res = common::client()
        .put("http://127.0.0.1:28218/orders/7?notify=true")
        .header("Authorization", "Bearer secret")
        .header("x-tenant", "acme")
        .body(payload.clone())
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "primary");

    let mirrored = replay.wait_for(1).await;
    assert_eq!(mirrored.len(), 1, "Replay target should receive one request");
    let request = &mirrored[0];
    assert_eq!(request.method, "PUT");
    assert_eq!(request.uri.path(), "/orders/7");
    assert_eq!(request.uri.query(), Some("notify=true"));
    assert!(request.headers.get("authorization").is_none());
    assert_eq!(request.headers.get("x-tenant").unwrap(), "acme");
    assert_eq!(request.body.len(), payload.len());
    assert_eq!(request.headers.get("host").unwrap(), "127.0.0.1:28217");

    let forwarded = backend.wait_for(1).await;
    assert_eq!(forwarded[0].body.len(), payload.len());
    assert_eq!(forwarded[0].headers.get("authorization").unwrap(), "Bearer secret");
    assert_eq!(forwarded[0].headers.get("host").unwrap(), "127.0.0.1:28218");
}

#[tokio::test]
async fn test_rule_without_replay_is_not_mirrored() {
    let _backend = common::start_recording_backend(addr(28219), StatusCode::OK, "ok").await;
    let replay = common::start_recording_backend(addr(28220), StatusCode::OK, "").await;
    let _shutdown = common::start_proxy(addr(28221), &proxyfile(28219, 28220, "")).await;

    let res = common::client()
        .get("http://127.0.0.1:28221/quiet")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(replay.len(), 0);
}

#[tokio::test]
async fn test_forward_failure_still_replays() {
    // Downstream 28222 is down; replay target is up.
    let replay = common::start_recording_backend(addr(28223), StatusCode::OK, "").await;
    let _shutdown = common::start_proxy(addr(28224), &proxyfile(28222, 28223, "")).await;

    let res = common::client()
        .post("http://127.0.0.1:28224/orders")
        .body("payload")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 502);
    let mirrored = replay.wait_for(1).await;
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0].body.as_ref(), b"payload");
}

#[tokio::test]
async fn test_failing_replay_leaves_primary_untouched() {
    let _backend = common::start_recording_backend(addr(28225), StatusCode::OK, "primary").await;
    let replay =
        common::start_recording_backend(addr(28226), StatusCode::INTERNAL_SERVER_ERROR, "boom")
            .await;
    let _shutdown = common::start_proxy(addr(28227), &proxyfile(28225, 28226, "")).await;

    let res = common::client()
        .get("http://127.0.0.1:28227/orders/1")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "primary");
    assert_eq!(replay.wait_for(1).await.len(), 1);
}

#[tokio::test]
async fn test_replay_rewrites_path_and_method() {
    let _backend = common::start_recording_backend(addr(28228), StatusCode::OK, "ok").await;
    let replay = common::start_recording_backend(addr(28229), StatusCode::OK, "").await;
    let extra = r#"      pathRewriteSettings:
        strategy: Rewrite
        path: /audit
      methodRewriteSettings:
        strategy: Rewrite
        method: POST"#;
    let _shutdown = common::start_proxy(addr(28230), &proxyfile(28228, 28229, extra)).await;

    let res = common::client()
        .get("http://127.0.0.1:28230/orders/9")
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), 200);

    let mirrored = replay.wait_for(1).await;
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0].method, "POST");
    assert_eq!(mirrored[0].uri.path(), "/audit");
}

#[tokio::test]
async fn test_replay_envelope() {
    let _backend = common::start_recording_backend(addr(28231), StatusCode::OK, "ok").await;
    let replay = common::start_recording_backend(addr(28232), StatusCode::OK, "").await;
    let extra = "      envelope: true";
    let _shutdown = common::start_proxy(addr(28233), &proxyfile(28231, 28232, extra)).await;

    let res = common::client()
        .post("http://127.0.0.1:28233/orders")
        .header("content-type", "text/plain")
        .body("hello")
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), 200);

    let mirrored = replay.wait_for(1).await;
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0].headers.get("content-type").unwrap(), "application/json");
    let document: serde_json::Value = serde_json::from_slice(&mirrored[0].body).unwrap();
    assert_eq!(document["method"], "POST");
    assert_eq!(document["path"], "/orders");
    assert_eq!(document["body"], "aGVsbG8=");
    assert_eq!(document["remote_ip"], "127.0.0.1");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let backend = common::start_recording_backend(addr(28234), StatusCode::OK, "ok").await;
    let proxyfile = proxyfile(28234, 28235, "").replace(
        "    timeouts:",
        "    maxBodyBytes: 16\n    timeouts:",
    );
    let _shutdown = common::start_proxy(addr(28236), &proxyfile).await;

    let res = common::client()
        .post("http://127.0.0.1:28236/orders")
        .body("0123456789abcdef0123456789abcdef")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 413);
    assert_eq!(backend.len(), 0);
}

#[tokio::test]
async fn test_slow_replay_target_does_not_delay_primary() {
    let _backend = common::start_recording_backend(addr(28237), StatusCode::OK, "fast").await;
    let replay = common::start_slow_backend(addr(28238), Duration::from_secs(3)).await;
    let _shutdown = common::start_proxy(addr(28239), &proxyfile(28237, 28238, "")).await;

    let started = Instant::now();
    let res = common::client()
        .post("http://127.0.0.1:28239/orders")
        .body("payload")
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "fast");
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_secs(1),
        "Primary response took {elapsed:?} behind a 3s replay target"
    );
    assert_eq!(replay.wait_for(1).await.len(), 1);
}
