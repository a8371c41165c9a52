//! Response transformation pipeline.
//!
//! # Data Flow
//! ```text
//! Backend body (Bytes) + response headers
//!     → ipv4-redactor (priority 10)
//!     → ipv6-redactor (priority 10)
//!     → response-size-limiter (priority 20)
//!     → brotli-compressor (priority 1000)
//!     → transformed body; headers possibly marked with Content-Encoding
//! ```
//!
//! # Design Decisions
//! - Modules are registered once, during startup, on an owned registry
//! - The registry is shared read-only (`Arc`) with request handlers
//! - Every stage consumes the previous stage's output and nothing else

pub mod compress;
pub mod module;
pub mod redact;
pub mod registry;
pub mod size_limit;

pub use compress::BrotliCompressor;
pub use module::{Modifier, Module};
pub use redact::{AddressFamily, Redactor};
pub use registry::ModuleRegistry;
pub use size_limit::SizeLimiter;

use crate::config::PipelineConfig;

/// Build the registry of built-in modules enabled in `config`.
pub fn standard_registry(config: &PipelineConfig) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();

    if config.ipv4_redactor.enabled {
        registry.register(
            Redactor::new(AddressFamily::V4, config.redaction_token.as_str())
                .into_module(config.ipv4_redactor.priority.unwrap_or(redact::DEFAULT_PRIORITY)),
        );
    }

    if config.ipv6_redactor.enabled {
        registry.register(
            Redactor::new(AddressFamily::V6, config.redaction_token.as_str())
                .into_module(config.ipv6_redactor.priority.unwrap_or(redact::DEFAULT_PRIORITY)),
        );
    }

    if config.size_limiter.enabled {
        registry.register(
            SizeLimiter::new(config.size_limiter.max_bytes)
                .into_module(config.size_limiter.priority.unwrap_or(size_limit::DEFAULT_PRIORITY)),
        );
    }

    if config.compressor.enabled {
        registry.register(
            BrotliCompressor::new(config.compressor.quality)
                .into_module(config.compressor.priority.unwrap_or(compress::DEFAULT_PRIORITY)),
        );
    }

    tracing::info!(title = "ModuleLoader", modules = registry.len(), "Pipeline composed");
    registry
}
