//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap outbound calls (forward and replay) with a deadline
//! - Keep timeout errors distinct from the call's own errors
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - Timed-out forwards return 504 Gateway Timeout
//! - Timed-out replays are logged and abandoned

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Failure of a deadline-bounded call.
#[derive(Debug, Error)]
pub enum Bounded<E> {
    #[error("deadline of {} ms exceeded", .0.as_millis())]
    Elapsed(Duration),

    #[error("{0}")]
    Inner(E),
}

/// Run `fut` to completion or until `deadline` passes.
pub async fn with_deadline<F, T, E>(deadline: Duration, fut: F) -> Result<T, Bounded<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(Bounded::Inner),
        Err(_) => Err(Bounded::Elapsed(deadline)),
    }
}
