//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store host routes keyed by normalized hostname
//! - Look up the host route for an inbound Host header
//! - Select the first path rule matching the inbound path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) host lookup via HashMap, no wildcard or subdomain matching
//! - O(n) path scan in declaration order, first match wins
//! - Explicit None rather than silent default

use std::collections::HashMap;

use crate::config::RuleConfig;
use crate::routing::matcher::{normalize_host, PathRule};

/// All path rules registered for one inbound hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRoute {
    /// Host as declared in configuration.
    pub host: String,
    pub paths: Vec<PathRule>,
}

impl HostRoute {
    pub fn new(host: impl Into<String>, paths: Vec<PathRule>) -> Self {
        Self {
            host: host.into(),
            paths,
        }
    }

    /// First rule whose path matches, regardless of method.
    pub fn match_path(&self, path: &str) -> Option<&PathRule> {
        self.paths.iter().find(|rule| rule.matches(path))
    }
}

/// Host → path rules routing table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, HostRoute>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from configuration rules. Later rules for the same host win.
    pub fn from_config(rules: &[RuleConfig]) -> Self {
        let mut table = Self::new();
        for rule in rules {
            let paths: Vec<PathRule> = rule.paths.iter().map(PathRule::from).collect();
            for path in &paths {
                tracing::debug!(
                    host = %rule.host,
                    path_type = ?path.match_type,
                    path = %path.match_path,
                    port = ?path.target_port,
                    tls = path.use_tls,
                    replay = path.replay_enabled,
                    "Registered route"
                );
            }
            table.register(&rule.host, paths);
        }
        table
    }

    /// Insert or replace the host route for `host`.
    pub fn register(&mut self, host: &str, paths: Vec<PathRule>) {
        let key = normalize_host(host);
        if self.routes.contains_key(&key) {
            tracing::warn!(host = %host, "Host declared more than once, last declaration wins");
        }
        self.routes.insert(key, HostRoute::new(host, paths));
    }

    /// Look up the route for an inbound hostname (port ignored).
    pub fn lookup(&self, hostname: &str) -> Option<&HostRoute> {
        self.routes.get(&normalize_host(hostname))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
