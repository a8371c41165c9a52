//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the configuration and apply command-line overrides
//! - Resolve the backend authority from configuration
//! - Bind the client-facing listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners bind last, after the pipeline is composed

use std::path::Path;

use axum::http::uri::{Authority, InvalidUri};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{
    load_config, validate_config, BackendConfig, ConfigError, ListenerConfig, ProxyConfig,
};

/// Fatal errors raised before the proxy starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid backend address '{address}': {source}")]
    InvalidBackend {
        address: String,
        #[source]
        source: InvalidUri,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Load `path` (or the defaults) and apply listen/backend overrides.
///
/// Overridden configs are validated again.
pub fn resolve_config(
    path: Option<&Path>,
    listen: Option<&str>,
    backend: Option<&str>,
) -> Result<ProxyConfig, StartupError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    if listen.is_none() && backend.is_none() {
        return Ok(config);
    }
    if let Some(listen) = listen {
        config.listener.bind_address = listen.to_string();
    }
    if let Some(backend) = backend {
        config.backend.address = backend.to_string();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse the backend address into a URI authority.
pub fn backend_authority(config: &BackendConfig) -> Result<Authority, StartupError> {
    config
        .address
        .parse()
        .map_err(|source| StartupError::InvalidBackend {
            address: config.address.clone(),
            source,
        })
}

/// Bind the listener named in `config`.
pub async fn bind_listener(config: &ListenerConfig) -> Result<TcpListener, StartupError> {
    let listener = TcpListener::bind(&config.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.bind_address.clone(),
            source,
        })?;

    if let Ok(local) = listener.local_addr() {
        tracing::debug!(title = "Listener", address = %local, "Listener bound");
    }
    Ok(listener)
}
