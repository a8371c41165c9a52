//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, sink line format)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the HTTP layers and the forwarded request
//! - Metrics are cheap (atomic increments) and off by default

pub mod logging;
pub mod metrics;

pub use logging::StatusTag;
