//! Sanitizing reverse proxy library.

// Core subsystems
pub mod config;
pub mod http;
pub mod pipeline;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::{HttpServer, ResponseInterceptor};
pub use lifecycle::Shutdown;
pub use pipeline::{Module, ModuleRegistry};
