//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound request
//! - Rewrite the outbound request so it targets the fixed backend
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing and forwarded upstream
//! - `Accept-Encoding` is dropped so the backend answers in identity encoding;
//!   the pipeline needs plaintext to redact

use axum::http::request::Parts;
use axum::http::uri::{self, Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderName, HeaderValue, Request, Uri, Version};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::headers::strip_hop_by_hop;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Issues UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Point an inbound request at `backend` over plain HTTP/1.1.
pub fn direct(parts: &mut Parts, backend: &Authority) {
    let mut uri_parts = uri::Parts::default();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(backend.clone());
    uri_parts.path_and_query = Some(
        parts
            .uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/")),
    );
    if let Ok(target) = Uri::from_parts(uri_parts) {
        parts.uri = target;
    }

    if let Ok(host) = HeaderValue::from_str(backend.as_str()) {
        parts.headers.insert(header::HOST, host);
    }

    strip_hop_by_hop(&mut parts.headers);
    parts.headers.remove(header::ACCEPT_ENCODING);
    parts.version = Version::HTTP_11;
}
