//! Replay Proxy
//!
//! Host and path based HTTP reverse proxy that can mirror requests to a
//! secondary target without touching the primary response.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 REPLAY PROXY                  │
//!                         │                                               │
//!     Client Request      │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!     ────────────────────┼─▶│  http   │──▶│ snapshot │──▶│  routing  │  │
//!                         │  │ server  │   │ capture  │   │   table   │  │
//!                         │  └─────────┘   └──────────┘   └─────┬─────┘  │
//!                         │                                     │        │
//!                         │                    ┌────────────────┴──┐     │
//!                         │                    ▼                   ▼     │
//!                         │             ┌────────────┐     ┌───────────┐ │
//!                         │             │   replay   │     │ forwarder │ │
//!                         │             │ (detached) │     │           │ │
//!                         │             └─────┬──────┘     └─────┬─────┘ │
//!                         └───────────────────┼──────────────────┼───────┘
//!                                             ▼                  ▼
//!                                       Replay target       Downstream
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use replay_proxy::config::{load_config, ConfigError, ProxyConfig};
use replay_proxy::lifecycle::{signals, Shutdown};
use replay_proxy::observability::{init_logging, metrics};
use replay_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "replay-proxy")]
#[command(about = "Host and path based reverse proxy with request replay", long_about = None)]
struct Cli {
    /// Proxyfile to load (YAML, or TOML/JSON by extension)
    #[arg(short, long, env = "PROXYFILE", default_value = "Proxyfile")]
    config: PathBuf,

    /// Override `spec.server.port`
    #[arg(short, long)]
    port: Option<u16>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config);
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => ProxyConfig::default(),
    };
    init_logging(&config.spec.observability);

    let mut config = match loaded {
        Ok(config) => {
            tracing::info!(path = %cli.config.display(), "Configuration loaded");
            config
        }
        Err(e) if e.is_not_found() && !cli.check => {
            tracing::warn!(
                path = %cli.config.display(),
                "Configuration file not found, running with defaults"
            );
            config
        }
        Err(e) => {
            report_config_error(&cli.config, &e);
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        tracing::info!(path = %cli.config.display(), "Configuration is valid");
        return ExitCode::SUCCESS;
    }

    if let Some(port) = cli.port {
        config.spec.server.port = port;
    }

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Proxy failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("replay-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if config.annotations.rate_limiting_enabled {
        tracing::warn!("Rate limiting is enabled in configuration but not implemented, ignoring");
    }

    let server_config = &config.spec.server;
    tracing::info!(
        bind_address = %server_config.bind_address,
        port = config.port(),
        rules = config.rules().len(),
        replay_enabled = config.replay_enabled(),
        forward_timeout_secs = server_config.timeouts.forward_secs,
        "Configuration applied"
    );

    let observability = &config.spec.observability;
    if observability.metrics_enabled {
        match observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = if server_config.bind_address.contains(':') {
        format!("[{}]:{}", server_config.bind_address, config.port())
    } else {
        format!("{}:{}", server_config.bind_address, config.port())
    };
    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let stop = shutdown.listener();
    tokio::spawn(signals::listen(shutdown));

    server.run(listener, stop).await?;
    Ok(())
}

fn report_config_error(path: &std::path::Path, error: &ConfigError) {
    match error {
        ConfigError::Validation(errors) => {
            for problem in errors {
                tracing::error!(
                    path = %path.display(),
                    problem = %problem,
                    "Invalid configuration"
                );
            }
        }
        other => tracing::error!(
            path = %path.display(),
            error = %other,
            "Failed to load configuration"
        ),
    }
}
