//! Brotli compression of text-like bodies.
//!
//! # Responsibilities
//! - Leave bodies that already declare a `Content-Encoding` alone
//! - Compress only compressible content types
//! - Mark compressed bodies with `Content-Encoding: br` and `Vary: Accept-Encoding`
//!
//! # Design Decisions
//! - Fails open: any encoder error returns the input with headers untouched
//! - Runs last so it sees the final plaintext
//! - No negotiation: the request's `Accept-Encoding` never reaches the
//!   pipeline (the director strips it so the backend answers in identity
//!   encoding), so eligible bodies are sent as `br` to every client. `Vary`
//!   is still appended for shared caches in front of the proxy.

use axum::http::{header, HeaderMap, HeaderValue};
use brotli::enc::BrotliEncoderParams;
use bytes::Bytes;

use crate::pipeline::module::{Modifier, Module};

pub const DEFAULT_PRIORITY: i32 = 1000;

pub const DEFAULT_QUALITY: u32 = 6;

/// Highest quality the encoder accepts.
pub const MAX_QUALITY: u32 = 11;

pub const MODULE_NAME: &str = "brotli-compressor";

const LG_WINDOW_SIZE: i32 = 22;

/// Content types compressed besides `text/*`.
const COMPRESSIBLE_TYPES: &[&str] = &[
    "application/json",
    "application/javascript",
    "application/xml",
    "image/svg+xml",
];

/// Whether a `Content-Type` value names a compressible media type.
///
/// Parameters such as `charset` are ignored.
pub fn is_compressible(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("text/") || COMPRESSIBLE_TYPES.contains(&essence.as_str())
}

#[derive(Debug, Clone, Copy)]
pub struct BrotliCompressor {
    quality: u32,
}

impl BrotliCompressor {
    pub fn new(quality: u32) -> Self {
        Self {
            quality: quality.min(MAX_QUALITY),
        }
    }

    /// Compress `content` into a complete Brotli stream.
    pub fn compress(&self, content: &[u8]) -> std::io::Result<Vec<u8>> {
        let params = BrotliEncoderParams {
            quality: self.quality as i32,
            lgwin: LG_WINDOW_SIZE,
            ..Default::default()
        };

        let mut input = content;
        let mut output = Vec::with_capacity(content.len() / 2);
        brotli::BrotliCompress(&mut input, &mut output, &params)?;
        Ok(output)
    }

    pub fn into_module(self, priority: i32) -> Module {
        Module::new(MODULE_NAME, self)
            .with_description("Compresses responses with Brotli")
            .with_version("1.0.0")
            .with_priority(priority)
    }
}

impl Default for BrotliCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl Modifier for BrotliCompressor {
    fn modify(&self, content: Bytes, headers: &mut HeaderMap) -> Bytes {
        if headers.contains_key(header::CONTENT_ENCODING) {
            return content;
        }

        let compressible = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_compressible);
        if !compressible {
            return content;
        }

        match self.compress(&content) {
            Ok(compressed) => {
                headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("br"));
                headers.append(header::VARY, HeaderValue::from_static("Accept-Encoding"));
                Bytes::from(compressed)
            }
            Err(e) => {
                tracing::warn!(title = "BrotliCompressor", error = %e, "Compression failed, serving uncompressed");
                content
            }
        }
    }
}
