//! Sanitizing reverse proxy.
//!
//! Forwards every request to a single backend and rewrites the response body
//! through a pipeline of modules before it reaches the client.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ listener ──▶ http server ──▶ director ──────────────▶ Backend
//!                                                                       │
//!     Client ◀── http server ◀── ResponseInterceptor ◀── module pipeline◀┘
//!                                  │
//!                                  ├─ ipv4-redactor          (10)
//!                                  ├─ ipv6-redactor          (10)
//!                                  ├─ response-size-limiter  (20)
//!                                  └─ brotli-compressor      (1000)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use sanitizing_proxy::config::{ObservabilityConfig, ProxyConfig};
use sanitizing_proxy::lifecycle::{bind_listener, resolve_config, Shutdown, StartupError};
use sanitizing_proxy::observability::{logging, metrics, StatusTag};
use sanitizing_proxy::pipeline::standard_registry;
use sanitizing_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "sanitizing-proxy")]
#[command(about = "Reverse proxy that redacts, limits and compresses responses", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Override the backend address (host:port)
    #[arg(short, long)]
    backend: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(
        cli.config.as_deref(),
        cli.listen.as_deref(),
        cli.backend.as_deref(),
    ) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&ObservabilityConfig::default());
            tracing::error!(status = %StatusTag::Err, title = "Config", error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);
    tracing::info!(
        status = %StatusTag::Build,
        title = "Startup",
        version = env!("CARGO_PKG_VERSION"),
        "sanitizing-proxy starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                title = "Metrics",
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    match serve(config).await {
        Ok(()) => {
            tracing::info!(title = "Shutdown", "Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(status = %StatusTag::Err, title = "Startup", error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: ProxyConfig) -> Result<(), StartupError> {
    let registry = Arc::new(standard_registry(&config.pipeline));
    let server = HttpServer::new(config.clone(), registry)?;

    let listener = bind_listener(&config.listener).await?;
    let address = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| config.listener.bind_address.clone());
    tracing::info!(
        status = %StatusTag::Ok,
        title = "Startup",
        address = %address,
        backend = %config.backend.address,
        "Serving"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}
