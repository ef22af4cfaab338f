//! Replay subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request (snapshot + rule):
//!     → dispatcher.rs (global && rule switch, concurrency permit)
//!     → plan.rs (suppress headers, rewrite path/method, optional envelope)
//!     → shared client, bounded by the replay deadline
//!     → outcome logged and counted, never returned to the caller
//! ```
//!
//! # Design Decisions
//! - `ReplayConfig` is built once and shared read-only
//! - Replay never blocks, delays or alters the primary response

pub mod config;
pub mod dispatcher;
pub mod plan;

pub use config::{MethodStrategy, PathStrategy, ReplayConfig};
pub use dispatcher::{ReplayDispatcher, ReplayError};
pub use plan::build_replay_request;
