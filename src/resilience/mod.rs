//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to downstream or replay target:
//!     → timeouts.rs (enforce deadline)
//!     → On failure: mapped to 502/504 (forward) or logged (replay)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: a forwarded request is sent once, a replay is attempted once

pub mod timeouts;

pub use timeouts::{with_deadline, Bounded};
