//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate header names, methods and paths the runtime will parse
//! - Validate value ranges (timeouts > 0, replay bound > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::{HeaderName, Method};
use thiserror::Error;

use crate::config::schema::{MethodRewriteStrategy, PathRewriteStrategy, ProxyConfig};

/// A single semantic problem in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rule #{index} has an empty host")]
    EmptyHost { index: usize },

    #[error("path {path:?} for host {host} must start with '/'")]
    InvalidPath { host: String, path: String },

    #[error("invalid request id header {0:?}")]
    InvalidRequestIdHeader(String),

    #[error("replay scheme must be http or https, got {0:?}")]
    InvalidReplayScheme(String),

    #[error("replay is enabled but no replay host is configured")]
    MissingReplayHost,

    #[error("invalid suppressed header name {0:?}")]
    InvalidHeaderName(String),

    #[error("invalid replay rewrite method {0:?}")]
    InvalidRewriteMethod(String),

    #[error("replay rewrite path {0:?} must start with '/'")]
    InvalidRewritePath(String),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if HeaderName::from_bytes(config.annotations.request_id_header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidRequestIdHeader(
            config.annotations.request_id_header.clone(),
        ));
    }

    for (index, rule) in config.rules().iter().enumerate() {
        if rule.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost { index });
        }
        for path in &rule.paths {
            if !path.path.starts_with('/') {
                errors.push(ValidationError::InvalidPath {
                    host: rule.host.clone(),
                    path: path.path.clone(),
                });
            }
        }
    }

    let server = &config.spec.server;
    if server.timeouts.connect_secs == 0 {
        errors.push(ValidationError::NotPositive("server.timeouts.connectSecs"));
    }
    if server.timeouts.forward_secs == 0 {
        errors.push(ValidationError::NotPositive("server.timeouts.forwardSecs"));
    }
    if server.timeouts.replay_secs == 0 {
        errors.push(ValidationError::NotPositive("server.timeouts.replaySecs"));
    }
    if server.max_body_bytes == 0 {
        errors.push(ValidationError::NotPositive("server.maxBodyBytes"));
    }

    errors.extend(validate_replay(config));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Replay checks, shared with runtime construction of the replay configuration.
pub fn validate_replay(config: &ProxyConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let replay = &config.spec.server.replay;

    for header in &replay.suppressed_headers {
        if HeaderName::from_bytes(header.name().as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(header.name().to_string()));
        }
    }

    let rewrite = &replay.method_rewrite_settings;
    if rewrite.strategy == MethodRewriteStrategy::Rewrite
        && (rewrite.method.is_empty() || Method::from_bytes(rewrite.method.as_bytes()).is_err())
    {
        errors.push(ValidationError::InvalidRewriteMethod(rewrite.method.clone()));
    }

    let path = &replay.path_rewrite_settings;
    if path.strategy == PathRewriteStrategy::Rewrite && !path.path.starts_with('/') {
        errors.push(ValidationError::InvalidRewritePath(path.path.clone()));
    }

    if config.replay_enabled() {
        let scheme = replay.scheme.trim();
        if !(scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")) {
            errors.push(ValidationError::InvalidReplayScheme(replay.scheme.clone()));
        }
        if replay.host.trim().is_empty() {
            errors.push(ValidationError::MissingReplayHost);
        }
        if replay.max_in_flight == 0 {
            errors.push(ValidationError::NotPositive("server.replay.maxInFlight"));
        }
    }

    errors
}
