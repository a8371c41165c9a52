//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → consumed once during startup composition
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no runtime reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BackendConfig, BudgetPolicy, CompressorConfig, ListenerConfig, LogFormat, ModuleConfig,
    ObservabilityConfig, PipelineConfig, ProxyConfig, SizeLimiterConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
