//! Module contract for the response pipeline.
//!
//! A module is a named, versioned, prioritized content transformation. The
//! transformation itself is a [`Modifier`]: it receives the body produced by
//! the previous stage plus the response headers, and returns the body for the
//! next stage.

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use bytes::Bytes;

/// A content transformation applied to a response body.
///
/// Implementations must not keep the buffer or any per-call state after
/// returning. A modifier that cannot complete its work returns its input.
pub trait Modifier: Send + Sync {
    /// Transform `content`, optionally reading or writing `headers`.
    fn modify(&self, content: Bytes, headers: &mut HeaderMap) -> Bytes;
}

impl<F> Modifier for F
where
    F: Fn(Bytes, &mut HeaderMap) -> Bytes + Send + Sync,
{
    fn modify(&self, content: Bytes, headers: &mut HeaderMap) -> Bytes {
        self(content, headers)
    }
}

/// A registered pipeline stage.
#[derive(Clone)]
pub struct Module {
    name: String,
    description: String,
    version: String,
    priority: i32,
    modifier: Arc<dyn Modifier>,
}

impl Module {
    /// Create a module with priority 0 and empty metadata.
    pub fn new(name: impl Into<String>, modifier: impl Modifier + 'static) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: String::new(),
            priority: 0,
            modifier: Arc::new(modifier),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Lower values run earlier.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Run this module's modifier.
    pub fn modify(&self, content: Bytes, headers: &mut HeaderMap) -> Bytes {
        self.modifier.modify(content, headers)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
