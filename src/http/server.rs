//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Forward every request to the single backend
//! - Hand backend responses to the [`ResponseInterceptor`]
//!
//! # Data Flow
//! ```text
//! Client request
//!     → SetRequestIdLayer → TraceLayer → TimeoutLayer
//!     → proxy_handler: direct() → backend
//!     → strip hop-by-hop → ResponseInterceptor::intercept
//!     → PropagateRequestIdLayer → client
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{uri::Authority, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::headers::strip_hop_by_hop;
use crate::http::request::{direct, UuidRequestId, X_REQUEST_ID};
use crate::http::response::ResponseInterceptor;
use crate::lifecycle::{backend_authority, StartupError};
use crate::observability::metrics;
use crate::pipeline::ModuleRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub backend: Authority,
    pub interceptor: Arc<ResponseInterceptor>,
}

/// HTTP server for the sanitizing proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server that forwards to the configured backend and rewrites
    /// responses with `registry`.
    pub fn new(config: ProxyConfig, registry: Arc<ModuleRegistry>) -> Result<Self, StartupError> {
        let backend = backend_authority(&config.backend)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let interceptor = Arc::new(ResponseInterceptor::from_config(registry, &config.pipeline));

        let state = AppState {
            client,
            backend,
            interceptor,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            title = "HttpServer",
            address = %addr,
            backend = %self.config.backend.address,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(title = "HttpServer", "HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Forward a request to the backend and transform its response.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = request.method().to_string();

    let (mut parts, body) = request.into_parts();
    tracing::debug!(
        title = "Director",
        request_id = %request_id,
        method = %method,
        path = %parts.uri.path(),
        "Proxying request"
    );
    direct(&mut parts, &state.backend);

    let upstream = match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                title = "Upstream",
                request_id = %request_id,
                backend = %state.backend,
                error = %e,
                "Upstream request failed"
            );
            metrics::record_request(&method, StatusCode::BAD_GATEWAY.as_u16(), start_time);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let (mut parts, body) = upstream.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    let response = state
        .interceptor
        .intercept(Response::from_parts(parts, Body::new(body)))
        .await;

    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_backend() {
        let mut config = ProxyConfig::default();
        config.backend.address = "not a host".into();

        let result = HttpServer::new(config, Arc::new(ModuleRegistry::new()));

        assert!(matches!(result, Err(StartupError::InvalidBackend { .. })));
    }

    #[tokio::test]
    async fn builds_from_default_config() {
        let server = HttpServer::new(ProxyConfig::default(), Arc::new(ModuleRegistry::new())).unwrap();
        assert_eq!(server.config().backend.address, "127.0.0.1:2025");
    }
}
