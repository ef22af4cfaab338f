//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ProxyConfig, DEFAULT_REQUEST_ID_HEADER};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

impl ConfigError {
    /// True when the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Document format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.toml` and `.json` select their formats; anything else (including the
    /// extension-less `Proxyfile`) is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Load and validate configuration from a file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, ConfigFormat::from_path(path))
}

/// Parse, default and validate a configuration document.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ProxyConfig, ConfigError> {
    let mut config: ProxyConfig = if content.trim().is_empty() {
        ProxyConfig::default()
    } else {
        match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        }
    };

    apply_defaults(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Explicit empty values fall back to their defaults.
fn apply_defaults(config: &mut ProxyConfig) {
    if config.annotations.request_id_header.trim().is_empty() {
        config.annotations.request_id_header = DEFAULT_REQUEST_ID_HEADER.to_string();
    }
    let scheme = config.spec.server.replay.scheme.trim().to_ascii_lowercase();
    config.spec.server.replay.scheme = if scheme.is_empty() {
        "http".to_string()
    } else {
        scheme
    };
}
