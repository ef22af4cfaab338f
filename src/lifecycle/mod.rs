//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → listeners wake → server stops accepting → in-flight requests drain → exit
//! ```
//!
//! # Design Decisions
//! - Detached replay tasks are not awaited at shutdown; they end with the runtime

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownListener};
