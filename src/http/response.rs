//! Response interception and rewriting.
//!
//! # Responsibilities
//! - Read the backend body and run it through the module pipeline
//! - Keep `Content-Length`, `Content-Encoding` and the status in sync with
//!   the transformed body
//! - Enforce the optional read cap and execution budget
//!
//! # Design Decisions
//! - Bodies the transport already knows to be empty are passed through as is
//! - A body that reads as zero bytes skips the pipeline and becomes 204
//! - Only `Content-Encoding` values inherited from the backend are stripped;
//!   an encoding set by a module survives
//! - A body read failure answers 502, since the backend stream is consumed

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use axum::http::response::Parts;
use axum::http::{HeaderMap, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{Bytes, BytesMut};
use http_body_util::BodyExt;
use hyper::body::Body as _;
use thiserror::Error;

use crate::config::{BudgetPolicy, PipelineConfig};
use crate::http::headers::strip_inherited;
use crate::observability::metrics;
use crate::pipeline::ModuleRegistry;

/// Why a pipeline run did not produce a result.
#[derive(Debug, Error)]
enum PipelineAbort {
    #[error("pipeline exceeded its budget of {0:?}")]
    BudgetExhausted(Duration),

    #[error("pipeline module panicked: {0}")]
    ModulePanicked(#[from] tokio::task::JoinError),
}

impl PipelineAbort {
    fn reason(&self) -> &'static str {
        match self {
            PipelineAbort::BudgetExhausted(_) => "budget_exhausted",
            PipelineAbort::ModulePanicked(_) => "module_panicked",
        }
    }
}

/// Applies the module pipeline to backend responses.
#[derive(Debug)]
pub struct ResponseInterceptor {
    registry: Arc<ModuleRegistry>,
    max_read_bytes: Option<usize>,
    budget: Option<Duration>,
    budget_policy: BudgetPolicy,
}

impl ResponseInterceptor {
    /// Unbounded read, no budget.
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            max_read_bytes: None,
            budget: None,
            budget_policy: BudgetPolicy::default(),
        }
    }

    pub fn from_config(registry: Arc<ModuleRegistry>, config: &PipelineConfig) -> Self {
        Self::new(registry)
            .with_read_limit(config.max_read_bytes)
            .with_budget(config.budget_ms.map(Duration::from_millis), config.budget_policy)
    }

    /// Stop reading backend bodies after `limit` bytes.
    pub fn with_read_limit(mut self, limit: Option<usize>) -> Self {
        self.max_read_bytes = limit;
        self
    }

    /// Run the pipeline on the blocking pool under a wall-clock budget.
    pub fn with_budget(mut self, budget: Option<Duration>, policy: BudgetPolicy) -> Self {
        self.budget = budget;
        self.budget_policy = policy;
        self
    }

    /// Transform a backend response.
    pub async fn intercept(&self, response: Response<Body>) -> Response<Body> {
        let (mut parts, body) = response.into_parts();

        if body.is_end_stream() || body.size_hint().exact() == Some(0) {
            tracing::debug!(title = "ResponseHandler", "Skipping empty body");
            return Response::from_parts(parts, body);
        }

        let content = match self.read_body(body).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(title = "BodyReader", error = %e, "Failed to read backend body");
                return (StatusCode::BAD_GATEWAY, "Failed to read backend response").into_response();
            }
        };

        let inherited: Vec<HeaderValue> =
            parts.headers.get_all(CONTENT_ENCODING).iter().cloned().collect();

        if content.is_empty() {
            tracing::debug!(title = "ResponseHandler", "Backend body read empty, skipping pipeline");
            return rewrite(parts, content, &inherited);
        }

        let original_size = content.len();
        match self.run_pipeline(content.clone(), &mut parts.headers).await {
            Ok(transformed) => {
                tracing::debug!(
                    title = "ResponseHandler",
                    original_size,
                    new_size = transformed.len(),
                    "Pipeline applied"
                );
                rewrite(parts, transformed, &inherited)
            }
            Err(abort) => {
                metrics::record_pipeline_abort(abort.reason());
                match self.budget_policy {
                    BudgetPolicy::PassThrough => {
                        tracing::warn!(title = "ResponseHandler", error = %abort, "Serving original body");
                        pass_through(parts, content)
                    }
                    BudgetPolicy::Reject => {
                        tracing::error!(title = "ResponseHandler", error = %abort, "Rejecting response");
                        (StatusCode::BAD_GATEWAY, "Response processing failed").into_response()
                    }
                }
            }
        }
    }

    async fn read_body(&self, body: Body) -> Result<Bytes, axum::Error> {
        let Some(limit) = self.max_read_bytes else {
            return Ok(body.collect().await?.to_bytes());
        };

        let mut body = body;
        let mut buffer = BytesMut::new();
        while let Some(frame) = body.frame().await {
            let Ok(data) = frame?.into_data() else {
                continue;
            };
            buffer.extend_from_slice(&data);
            if buffer.len() > limit {
                tracing::warn!(
                    title = "BodyReader",
                    limit,
                    "Backend body exceeds read limit, truncating"
                );
                metrics::record_truncation("read-limit");
                buffer.truncate(limit);
                break;
            }
        }
        Ok(buffer.freeze())
    }

    async fn run_pipeline(
        &self,
        content: Bytes,
        headers: &mut HeaderMap,
    ) -> Result<Bytes, PipelineAbort> {
        let Some(budget) = self.budget else {
            return Ok(self.registry.apply(content, headers));
        };

        let registry = Arc::clone(&self.registry);
        let mut scratch = headers.clone();
        let task = tokio::task::spawn_blocking(move || {
            let content = registry.apply(content, &mut scratch);
            (content, scratch)
        });

        // On timeout the blocking task keeps running; its result is discarded.
        match tokio::time::timeout(budget, task).await {
            Ok(joined) => {
                let (content, transformed) = joined?;
                *headers = transformed;
                Ok(content)
            }
            Err(_) => Err(PipelineAbort::BudgetExhausted(budget)),
        }
    }
}

/// Attach transformed content and reconcile length, encoding and status.
fn rewrite(mut parts: Parts, content: Bytes, inherited: &[HeaderValue]) -> Response<Body> {
    strip_inherited(&mut parts.headers, &CONTENT_ENCODING, inherited);

    if content.is_empty() {
        tracing::warn!(title = "ContentSanitizer", "Generated empty response");
        parts.status = StatusCode::NO_CONTENT;
    }
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(content.len()));

    Response::from_parts(parts, Body::from(content))
}

/// Serve the body exactly as read from the backend.
fn pass_through(mut parts: Parts, content: Bytes) -> Response<Body> {
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(content.len()));
    Response::from_parts(parts, Body::from(content))
}
