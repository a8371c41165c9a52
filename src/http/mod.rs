//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, retarget at the backend)
//!     → backend
//!     → headers.rs (hop-by-hop stripping)
//!     → response.rs (module pipeline, header reconciliation)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::ResponseInterceptor;
pub use server::HttpServer;
