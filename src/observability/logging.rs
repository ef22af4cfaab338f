//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber once at startup
//! - Pick text or JSON output from configuration
//!
//! # Design Decisions
//! - `RUST_LOG` wins over `observability.logLevel` when set
//! - JSON format for log shippers, plain text for terminals

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::LogFormat;
use crate::config::ObservabilityConfig;

/// Filter used when neither `RUST_LOG` nor the config yields a valid directive.
const FALLBACK_FILTER: &str = "info";

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive(&config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}

/// A bare level (`debug`) applies to this crate and tower-http; anything
/// else is passed through as a full filter directive.
fn directive(level: &str) -> String {
    let level = level.trim();
    match level.to_ascii_lowercase().as_str() {
        "" => FALLBACK_FILTER.to_string(),
        "trace" | "debug" | "info" | "warn" | "error" => {
            format!("{level},replay_proxy={level},tower_http={level}")
        }
        _ => level.to_string(),
    }
}
