//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (normalized host lookup → HostRoute)
//!     → matcher.rs (first PathRule whose path matches)
//!     → resolver.rs (rule + host + path → downstream URL)
//!     → Return: downstream Uri, PathMismatch or RouteNotFound
//!
//! Route Compilation (at startup):
//!     RuleConfig[]
//!     → PathRule per configured path, in declaration order
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex anywhere (exact and prefix matching only)
//! - Deterministic: same input always matches same rule
//! - First match wins (declaration order)

pub mod matcher;
pub mod resolver;
pub mod router;

pub use matcher::{MatchType, PathRule};
pub use resolver::resolve;
pub use router::{HostRoute, RouteTable};
