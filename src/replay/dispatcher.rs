//! Replay dispatch.
//!
//! # Responsibilities
//! - Decide whether a matched request is mirrored
//! - Run each mirrored request as a detached task under the replay deadline
//! - Bound the number of concurrent replays
//! - Log and count every outcome
//!
//! # Design Decisions
//! - Fire-and-forget: the caller gets a `JoinHandle` it is free to drop
//! - Saturation drops the replay instead of queueing it
//! - Failures are terminal for that attempt: no retry, nothing surfaced
//!   to the original caller

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use http_body_util::BodyExt;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::http::client::HttpClient;
use crate::http::request::RequestSnapshot;
use crate::observability::metrics;
use crate::replay::config::ReplayConfig;
use crate::replay::plan::build_replay_request;
use crate::resilience::{with_deadline, Bounded};
use crate::routing::PathRule;

/// Why a single replay attempt failed.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("invalid replay url: {0}")]
    InvalidUrl(String),

    #[error("failed to encode replay envelope: {0}")]
    Envelope(String),

    #[error("replay request failed: {0}")]
    Request(String),

    #[error("replay timed out after {0} ms")]
    Timeout(u64),

    #[error("replay target answered {0}")]
    Status(StatusCode),
}

impl ReplayError {
    /// Metric label for this failure.
    pub fn outcome(&self) -> &'static str {
        match self {
            ReplayError::InvalidUrl(_) | ReplayError::Envelope(_) => "invalid",
            ReplayError::Request(_) => "error",
            ReplayError::Timeout(_) => "timeout",
            ReplayError::Status(_) => "rejected",
        }
    }
}

/// Schedules mirrored requests against the replay target.
#[derive(Clone)]
pub struct ReplayDispatcher {
    config: Arc<ReplayConfig>,
    client: HttpClient,
    permits: Arc<Semaphore>,
}

impl ReplayDispatcher {
    pub fn new(config: ReplayConfig, client: HttpClient) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_in_flight));
        Self {
            config: Arc::new(config),
            client,
            permits,
        }
    }

    /// Spawn a replay of `snapshot` if both the global and the rule switch
    /// are on. Returns `None` when nothing was scheduled.
    pub fn dispatch(
        &self,
        snapshot: &RequestSnapshot,
        rule: &PathRule,
        request_id: Option<String>,
    ) -> Option<JoinHandle<Result<StatusCode, ReplayError>>> {
        if !self.config.should_replay(rule) {
            return None;
        }

        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(
                    request_id = request_id.as_deref().unwrap_or("-"),
                    max_in_flight = self.config.max_in_flight,
                    "Replay dropped, too many in flight"
                );
                metrics::record_replay_dropped();
                return None;
            }
        };

        let dispatcher = self.clone();
        let snapshot = snapshot.clone();
        Some(tokio::spawn(async move {
            let _permit = permit;
            let request_id = request_id.unwrap_or_else(|| "-".to_string());
            let start = Instant::now();
            let result = dispatcher.replay(&snapshot).await;

            match &result {
                Ok(status) => {
                    tracing::info!(
                        request_id = %request_id,
                        host = %dispatcher.config.authority(),
                        path = %snapshot.path(),
                        status = status.as_u16(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Replayed HTTP request"
                    );
                    metrics::record_replay("success", start);
                }
                Err(e) => {
                    tracing::error!(
                        request_id = %request_id,
                        host = %dispatcher.config.authority(),
                        path = %snapshot.path(),
                        error = %e,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "HTTP replay failed"
                    );
                    metrics::record_replay(e.outcome(), start);
                }
            }
            result
        }))
    }

    /// Send one mirrored request and wait for its full response.
    pub async fn replay(&self, snapshot: &RequestSnapshot) -> Result<StatusCode, ReplayError> {
        let request = build_replay_request(&self.config, snapshot)?;
        tracing::debug!(method = %request.method(), url = %request.uri(), "Sending replay request");

        let exchange = async {
            let response = self.client.request(request).await.map_err(|e| e.to_string())?;
            let status = response.status();
            // Drain so the pooled connection can be reused.
            response.into_body().collect().await.map_err(|e| e.to_string())?;
            Ok::<_, String>(status)
        };

        let status = match with_deadline(self.config.timeout, exchange).await {
            Ok(status) => status,
            Err(Bounded::Elapsed(deadline)) => {
                return Err(ReplayError::Timeout(deadline.as_millis() as u64))
            }
            Err(Bounded::Inner(e)) => return Err(ReplayError::Request(e)),
        };

        if status.is_success() {
            Ok(status)
        } else {
            Err(ReplayError::Status(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeoutConfig;
    use crate::http::client::build_client;
    use axum::http::Request;
    use bytes::Bytes;

    fn snapshot() -> RequestSnapshot {
        let (parts, _) = Request::builder()
            .uri("/a")
            .header("host", "shop.local")
            .body(())
            .unwrap()
            .into_parts();
        RequestSnapshot::from_parts(&parts, Bytes::new(), "127.0.0.1:1".parse().unwrap())
    }

    fn dispatcher(config: ReplayConfig) -> ReplayDispatcher {
        ReplayDispatcher::new(config, build_client(&TimeoutConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn disabled_replay_schedules_nothing() {
        let dispatcher = dispatcher(ReplayConfig::disabled());
        let rule = PathRule::exact("/a").with_replay(true);
        assert!(dispatcher.dispatch(&snapshot(), &rule, None).is_none());
    }

    #[tokio::test]
    async fn rule_switch_is_required() {
        let config = ReplayConfig {
            enabled: true,
            host: "127.0.0.1".into(),
            port: Some(9),
            ..ReplayConfig::disabled()
        };
        let dispatcher = dispatcher(config);
        assert!(dispatcher.dispatch(&snapshot(), &PathRule::exact("/a"), None).is_none());
    }

    #[tokio::test]
    async fn saturated_dispatcher_drops() {
        let config = ReplayConfig {
            enabled: true,
            host: "127.0.0.1".into(),
            port: Some(9),
            max_in_flight: 1,
            ..ReplayConfig::disabled()
        };
        let dispatcher = dispatcher(config);
        let _held = Arc::clone(&dispatcher.permits).try_acquire_owned().unwrap();

        let rule = PathRule::exact("/a").with_replay(true);
        assert!(dispatcher.dispatch(&snapshot(), &rule, None).is_none());
    }

    #[tokio::test]
    async fn unreachable_target_fails_quietly() {
        let config = ReplayConfig {
            enabled: true,
            host: "127.0.0.1".into(),
            port: Some(9),
            ..ReplayConfig::disabled()
        };
        let dispatcher = dispatcher(config);
        let rule = PathRule::exact("/a").with_replay(true);

        let handle = dispatcher
            .dispatch(&snapshot(), &rule, Some("req-9".into()))
            .unwrap();
        let result = handle.await.unwrap();
        assert!(matches!(
            result,
            Err(ReplayError::Request(_)) | Err(ReplayError::Timeout(_))
        ));
        // Permit is released once the task ends.
        assert_eq!(dispatcher.permits.available_permits(), 1);
    }
}
