//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! Proxyfile (YAML, or TOML/JSON by extension)
//!     → loader.rs (parse, deserialize, fill empty values)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → RouteTable / ReplayConfig built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError, ConfigFormat};
pub use schema::ProxyConfig;
pub use schema::{
    MethodRewriteStrategy, ObservabilityConfig, PathConfig, PathRewriteStrategy, PathType,
    ReplaySettings, RuleConfig, ServerConfig, SuppressedHeader, TimeoutConfig,
};
