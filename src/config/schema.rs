//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::pipeline::{compress, redact, size_limit};

/// Root configuration for the sanitizing proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single backend every request is forwarded to.
    pub backend: BackendConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Response pipeline composition.
    pub pipeline: PipelineConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:1337").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:1337".to_string(),
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend authority (e.g., "127.0.0.1:2025"), reached over plain HTTP.
    pub address: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:2025".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// What the interceptor serves when the pipeline does not complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPolicy {
    /// Serve the original backend body and headers.
    #[default]
    PassThrough,
    /// Answer 502 Bad Gateway.
    Reject,
}

/// Response pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Replacement for redacted addresses.
    pub redaction_token: String,

    /// Stop reading backend bodies after this many bytes.
    /// Unset reads the whole body before the pipeline runs.
    pub max_read_bytes: Option<usize>,

    /// Wall-clock budget for one pipeline run in milliseconds.
    pub budget_ms: Option<u64>,

    /// Policy applied when the budget is exhausted or a module panics.
    pub budget_policy: BudgetPolicy,

    pub ipv4_redactor: ModuleConfig,

    pub ipv6_redactor: ModuleConfig,

    pub size_limiter: SizeLimiterConfig,

    pub compressor: CompressorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            redaction_token: redact::DEFAULT_REDACTION_TOKEN.to_string(),
            max_read_bytes: None,
            budget_ms: None,
            budget_policy: BudgetPolicy::default(),
            ipv4_redactor: ModuleConfig::default(),
            ipv6_redactor: ModuleConfig::default(),
            size_limiter: SizeLimiterConfig::default(),
            compressor: CompressorConfig::default(),
        }
    }
}

/// Toggle and ordering for a built-in module.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub enabled: bool,

    /// Overrides the module's built-in priority.
    pub priority: Option<i32>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SizeLimiterConfig {
    pub enabled: bool,

    pub priority: Option<i32>,

    /// Maximum body size in bytes after the limiter.
    pub max_bytes: usize,
}

impl Default for SizeLimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: None,
            max_bytes: size_limit::DEFAULT_MAX_BYTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressorConfig {
    pub enabled: bool,

    pub priority: Option<i32>,

    /// Brotli quality, 0 to 11.
    pub quality: u32,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: None,
            quality: compress::DEFAULT_QUALITY,
        }
    }
}

/// Log line rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// `[HH:MM:SS] [STATUS] [Title]: message` lines.
    #[default]
    Sink,
    /// Stock `tracing-subscriber` output.
    Full,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
