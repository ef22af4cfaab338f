//! Path rule matching.
//!
//! # Responsibilities
//! - Represent a single routing entry (match predicate + target transform)
//! - Match inbound paths exactly or by prefix
//! - Normalize host strings (strip scheme, strip port)
//!
//! # Design Decisions
//! - Path matching is case-sensitive and byte-wise
//! - Prefix matching has no segment-boundary awareness: `/car` matches `/cars/1`
//! - Host matching is case-insensitive (per HTTP spec)
//! - No regex to guarantee O(n) matching

use crate::config::{PathConfig, PathType};

/// How a rule compares the inbound path to its own path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Prefix,
}

impl From<PathType> for MatchType {
    fn from(path_type: PathType) -> Self {
        match path_type {
            PathType::Exact => MatchType::Exact,
            PathType::Prefix => MatchType::Prefix,
        }
    }
}

/// One routing entry for a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRule {
    pub match_path: String,
    pub match_type: MatchType,
    /// Downstream port; `None` keeps no port in the downstream URL.
    pub target_port: Option<u16>,
    /// Forward over https instead of http.
    pub use_tls: bool,
    pub replay_enabled: bool,
    /// Carried from configuration; rate limiting is not implemented.
    pub rate_limit_enabled: bool,
}

impl PathRule {
    pub fn exact(path: impl Into<String>) -> Self {
        Self::new(path, MatchType::Exact)
    }

    pub fn prefix(path: impl Into<String>) -> Self {
        Self::new(path, MatchType::Prefix)
    }

    fn new(path: impl Into<String>, match_type: MatchType) -> Self {
        Self {
            match_path: path.into(),
            match_type,
            target_port: None,
            use_tls: false,
            replay_enabled: false,
            rate_limit_enabled: false,
        }
    }

    /// Set the downstream port. Zero means no override.
    pub fn with_port(mut self, port: u16) -> Self {
        self.target_port = (port != 0).then_some(port);
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_replay(mut self, replay_enabled: bool) -> Self {
        self.replay_enabled = replay_enabled;
        self
    }

    /// Returns true if the inbound path satisfies this rule.
    pub fn matches(&self, path: &str) -> bool {
        match self.match_type {
            MatchType::Exact => path == self.match_path,
            MatchType::Prefix => path.starts_with(&self.match_path),
        }
    }

    /// Downstream scheme selected by the TLS flag.
    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }
}

impl From<&PathConfig> for PathRule {
    fn from(config: &PathConfig) -> Self {
        Self {
            match_path: config.path.clone(),
            match_type: config.path_type.into(),
            target_port: config.port_number.filter(|port| *port != 0),
            use_tls: config.tls,
            replay_enabled: config.enable_replay,
            rate_limit_enabled: config.enable_rate_limit,
        }
    }
}

/// Drop a leading `scheme://` if present.
pub fn strip_scheme(host: &str) -> &str {
    match host.split_once("://") {
        Some((_, rest)) => rest,
        None => host,
    }
}

/// Drop a trailing `:port` if present. Bracketed IPv6 literals keep their brackets.
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.split_once(':') {
        Some((name, _)) => name,
        None => host,
    }
}

/// Routing key for a host: port stripped, lowercased.
pub fn normalize_host(host: &str) -> String {
    strip_port(host.trim()).to_ascii_lowercase()
}
