//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy engine, replay dispatcher, server:
//!     → logging.rs (structured log events, text or JSON)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through logs on both the forward and replay paths
//! - Metrics are cheap and off unless enabled

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
