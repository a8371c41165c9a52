//! Header manipulation shared by the request and response paths.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Remove header values inherited from the backend while keeping values
//!   the pipeline added

use axum::http::header::{
    CONNECTION, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

static HOP_BY_HOP: [HeaderName; 8] = [
    CONNECTION,
    KEEP_ALIVE,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Remove the values of `name` that appear in `inherited`, keeping the rest in order.
pub fn strip_inherited(headers: &mut HeaderMap, name: &HeaderName, inherited: &[HeaderValue]) {
    if inherited.is_empty() {
        return;
    }

    let kept: Vec<HeaderValue> = headers
        .get_all(name)
        .iter()
        .filter(|value| !inherited.contains(*value))
        .cloned()
        .collect();

    headers.remove(name);
    for value in kept {
        headers.append(name.clone(), value);
    }
}
