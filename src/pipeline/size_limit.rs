//! Response size limiting.

use axum::http::HeaderMap;
use bytes::Bytes;

use crate::observability::metrics;
use crate::pipeline::module::{Modifier, Module};

/// 8 MiB.
pub const DEFAULT_MAX_BYTES: usize = 8 * 1024 * 1024;

/// Runs after redaction and before compression.
pub const DEFAULT_PRIORITY: i32 = 20;

pub const MODULE_NAME: &str = "response-size-limiter";

/// Hard byte cut of bodies longer than `max_bytes`.
///
/// The cut is not content aware and may split a multi-byte character or a
/// markup structure.
#[derive(Debug, Clone, Copy)]
pub struct SizeLimiter {
    max_bytes: usize,
}

impl SizeLimiter {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn limit(&self, content: Bytes) -> Bytes {
        if content.len() <= self.max_bytes {
            return content;
        }

        tracing::warn!(
            title = "SizeLimiter",
            original_size = content.len(),
            max_size = self.max_bytes,
            "Truncated oversized response"
        );
        metrics::record_truncation(MODULE_NAME);
        content.slice(..self.max_bytes)
    }

    pub fn into_module(self, priority: i32) -> Module {
        Module::new(MODULE_NAME, self)
            .with_description(format!("Limits response size to {} bytes", self.max_bytes))
            .with_version("1.0.1")
            .with_priority(priority)
    }
}

impl Default for SizeLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}

impl Modifier for SizeLimiter {
    fn modify(&self, content: Bytes, _headers: &mut HeaderMap) -> Bytes {
        self.limit(content)
    }
}
