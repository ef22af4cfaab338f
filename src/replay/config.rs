//! Runtime replay configuration.
//!
//! Built once at startup from the Proxyfile and shared read-only by every
//! in-flight replay. Header names, the rewrite method and the rewrite path
//! are parsed here so the per-request path never re-parses configuration.

use std::time::Duration;

use axum::http::{HeaderName, Method};

use crate::config::loader::ConfigError;
use crate::config::validation::validate_replay;
use crate::config::{MethodRewriteStrategy, PathRewriteStrategy, ProxyConfig};
use crate::routing::PathRule;

/// Path used for the mirrored request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStrategy {
    /// Inbound path and query.
    Preserve,
    /// Fixed path from configuration.
    Rewrite(String),
    /// Root path.
    Suppress,
}

/// Method used for the mirrored request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodStrategy {
    Preserve,
    Rewrite(Method),
}

/// Process-wide replay settings.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Global switch, ANDed with each rule's own flag.
    pub enabled: bool,
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub suppressed_headers: Vec<HeaderName>,
    pub path_strategy: PathStrategy,
    pub method_strategy: MethodStrategy,
    /// Wrap the mirrored request in a JSON envelope.
    pub envelope: bool,
    /// Maximum concurrent replays; extra submissions are dropped.
    pub max_in_flight: usize,
    pub timeout: Duration,
}

impl ReplayConfig {
    /// Build from a loaded configuration. Fails on anything the runtime
    /// could not use (bad header names, bad rewrite method, missing host).
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let errors = validate_replay(config);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        let settings = &config.spec.server.replay;

        let mut suppressed_headers = Vec::with_capacity(settings.suppressed_headers.len());
        for header in &settings.suppressed_headers {
            if let Ok(name) = HeaderName::from_bytes(header.name().as_bytes()) {
                suppressed_headers.push(name);
            }
        }

        let path_strategy = match settings.path_rewrite_settings.strategy {
            PathRewriteStrategy::Preserve => PathStrategy::Preserve,
            PathRewriteStrategy::Rewrite => {
                PathStrategy::Rewrite(settings.path_rewrite_settings.path.clone())
            }
            PathRewriteStrategy::Suppress => PathStrategy::Suppress,
        };

        let method_strategy = match settings.method_rewrite_settings.strategy {
            MethodRewriteStrategy::Preserve => MethodStrategy::Preserve,
            MethodRewriteStrategy::Rewrite => {
                match Method::from_bytes(settings.method_rewrite_settings.method.as_bytes()) {
                    Ok(method) => MethodStrategy::Rewrite(method),
                    Err(_) => MethodStrategy::Preserve,
                }
            }
        };

        Ok(Self {
            enabled: config.replay_enabled(),
            scheme: settings.scheme.to_ascii_lowercase(),
            host: settings.host.trim().to_string(),
            port: settings.port.filter(|port| *port != 0),
            suppressed_headers,
            path_strategy,
            method_strategy,
            envelope: settings.envelope,
            max_in_flight: settings.max_in_flight.max(1),
            timeout: Duration::from_secs(config.spec.server.timeouts.replay_secs),
        })
    }

    /// A configuration that never replays.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            scheme: "http".to_string(),
            host: String::new(),
            port: None,
            suppressed_headers: Vec::new(),
            path_strategy: PathStrategy::Preserve,
            method_strategy: MethodStrategy::Preserve,
            envelope: false,
            max_in_flight: 1,
            timeout: Duration::from_secs(10),
        }
    }

    /// True when a request matched by `rule` should be mirrored.
    pub fn should_replay(&self, rule: &PathRule) -> bool {
        self.enabled && rule.replay_enabled
    }

    /// `host[:port]` of the replay target.
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }
}
