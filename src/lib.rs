//! Host and path based HTTP reverse proxy with asynchronous request replay.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod replay;
pub mod resilience;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, StartupError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
