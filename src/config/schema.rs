//! Configuration schema definitions.
//!
//! This module defines the Proxyfile structure consumed by the proxy.
//! All types derive Serde traits for deserialization from YAML, TOML or JSON.
//! Keys follow the Proxyfile convention (camelCase, annotations namespaced
//! under `proxy.conf/`).

use serde::{Deserialize, Serialize};

/// Port used when the configuration leaves `server.port` unset or zero.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Request id header used when the annotation is unset or empty.
pub const DEFAULT_REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Root configuration for the proxy (a "Proxyfile").
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Global switches.
    pub annotations: Annotations,

    /// Server, replay and routing rules.
    pub spec: ProxySpec,
}

impl ProxyConfig {
    /// Listening port, falling back to the default when unset.
    pub fn port(&self) -> u16 {
        match self.spec.server.port {
            0 => DEFAULT_HTTP_PORT,
            port => port,
        }
    }

    /// Whether replay is globally enabled.
    pub fn replay_enabled(&self) -> bool {
        self.annotations.replay_requests_enabled
    }

    pub fn rules(&self) -> &[RuleConfig] {
        &self.spec.rules
    }
}

/// Process-wide toggles.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Annotations {
    /// Globally enables request replay. Each path must also opt in.
    #[serde(rename = "proxy.conf/replay-requests-enabled")]
    pub replay_requests_enabled: bool,

    /// Parsed and carried; rate limiting is not implemented.
    #[serde(rename = "proxy.conf/rate-limiting-enabled")]
    pub rate_limiting_enabled: bool,

    /// Header that uniquely identifies each incoming request.
    #[serde(rename = "proxy.conf/request-id-header")]
    pub request_id_header: String,

    /// Log panic details and a backtrace when a handler panics.
    #[serde(rename = "proxy.conf/stack-trace-enabled")]
    pub stack_trace_enabled: bool,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            replay_requests_enabled: false,
            rate_limiting_enabled: false,
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
            stack_trace_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxySpec {
    pub server: ServerConfig,
    pub observability: ObservabilityConfig,
    pub rules: Vec<RuleConfig>,
}

/// Listener and outbound behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Listening port (0 means [`DEFAULT_HTTP_PORT`]).
    pub port: u16,

    /// Interface to bind.
    pub bind_address: String,

    /// Maximum inbound body size captured per request.
    pub max_body_bytes: usize,

    pub timeouts: TimeoutConfig,

    pub replay: ReplaySettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_HTTP_PORT,
            bind_address: "0.0.0.0".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            timeouts: TimeoutConfig::default(),
            replay: ReplaySettings::default(),
        }
    }
}

/// Deadlines for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeoutConfig {
    /// TCP connect timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for the downstream response headers in seconds.
    pub forward_secs: u64,

    /// Deadline for a whole replay attempt in seconds.
    pub replay_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            forward_secs: 30,
            replay_secs: 10,
        }
    }
}

/// Controls where and how requests are replayed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplaySettings {
    /// Replayed requests are sent using this scheme (http/https).
    pub scheme: String,

    /// Replayed requests are sent to this host.
    pub host: String,

    /// Replayed requests are sent to this port.
    pub port: Option<u16>,

    /// Replayed requests never include these headers.
    pub suppressed_headers: Vec<SuppressedHeader>,

    pub path_rewrite_settings: PathRewriteSettings,

    pub method_rewrite_settings: MethodRewriteSettings,

    /// Wrap the replayed request in a JSON envelope instead of sending the raw body.
    pub envelope: bool,

    /// Maximum replays in flight; extra replays are dropped.
    pub max_in_flight: usize,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: String::new(),
            port: None,
            suppressed_headers: Vec::new(),
            path_rewrite_settings: PathRewriteSettings::default(),
            method_rewrite_settings: MethodRewriteSettings::default(),
            envelope: false,
            max_in_flight: 256,
        }
    }
}

/// A suppressed header, written either as `- Authorization` or `- name: Authorization`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SuppressedHeader {
    Name(String),
    Named { name: String },
}

impl SuppressedHeader {
    pub fn name(&self) -> &str {
        match self {
            SuppressedHeader::Name(name) => name,
            SuppressedHeader::Named { name } => name,
        }
    }
}

/// Whether the replayed request keeps the original path.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PathRewriteStrategy {
    #[default]
    #[serde(alias = "Preserve", alias = "PRESERVE")]
    Preserve,
    #[serde(alias = "Rewrite", alias = "REWRITE")]
    Rewrite,
    #[serde(alias = "Suppress", alias = "SUPPRESS")]
    Suppress,
}

/// Whether the replayed request keeps the original method.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MethodRewriteStrategy {
    #[default]
    #[serde(alias = "Preserve", alias = "PRESERVE")]
    Preserve,
    #[serde(alias = "Rewrite", alias = "REWRITE")]
    Rewrite,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PathRewriteSettings {
    pub strategy: PathRewriteStrategy,
    /// Path used with [`PathRewriteStrategy::Rewrite`].
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MethodRewriteSettings {
    pub strategy: MethodRewriteStrategy,
    /// Method used with [`MethodRewriteStrategy::Rewrite`].
    pub method: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Routing rules for one inbound host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Host header to match (port ignored).
    pub host: String,

    /// Path rules, evaluated in order.
    #[serde(default)]
    pub paths: Vec<PathConfig>,
}

/// How a path rule compares the inbound path.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum PathType {
    Exact,
    Prefix,
}

/// A single path rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathConfig {
    pub path: String,

    pub path_type: PathType,

    /// Downstream port override (0 or absent keeps no port).
    #[serde(default)]
    pub port_number: Option<u16>,

    /// Forward over https.
    #[serde(default)]
    pub tls: bool,

    #[serde(default)]
    pub enable_replay: bool,

    /// Parsed and carried; has no effect.
    #[serde(default)]
    pub enable_rate_limit: bool,
}
