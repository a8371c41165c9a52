//! Module registry and ordered execution.
//!
//! # Responsibilities
//! - Hold every registered module, keyed by name
//! - Derive the execution order (priority ascending, registration slot on ties)
//! - Thread a body through every module via [`ModuleRegistry::apply`]
//!
//! # Design Decisions
//! - Registration needs `&mut self`; once wrapped in an `Arc` the registry is
//!   read-only, so request tasks share it without locking
//! - Re-registering a name replaces the module but keeps its original slot
//! - `apply` has no error channel; modules fail open on their own

use std::collections::HashMap;
use std::time::Instant;

use axum::http::HeaderMap;
use bytes::Bytes;

use crate::observability::metrics;
use crate::pipeline::module::Module;

/// Ordered collection of pipeline modules.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    /// Modules in registration-slot order.
    modules: Vec<Module>,
    /// Module name to slot index.
    slots: HashMap<String, usize>,
    /// Slot indices in execution order.
    order: Vec<usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a module, replacing any module already registered under the same name.
    pub fn register(&mut self, module: Module) -> &mut Self {
        tracing::debug!(
            title = "ModuleLoader",
            module = module.name(),
            version = module.version(),
            priority = module.priority(),
            "Registered module"
        );

        match self.slots.get(module.name()) {
            Some(&slot) => {
                tracing::debug!(
                    title = "ModuleLoader",
                    module = module.name(),
                    replaced_version = self.modules[slot].version(),
                    "Replaced existing module"
                );
                self.modules[slot] = module;
            }
            None => {
                self.slots.insert(module.name().to_string(), self.modules.len());
                self.modules.push(module);
            }
        }

        self.reorder();
        self
    }

    /// Run `content` through every module in execution order.
    ///
    /// All modules share `headers`, so later modules observe what earlier ones set.
    pub fn apply(&self, content: Bytes, headers: &mut HeaderMap) -> Bytes {
        self.order.iter().fold(content, |content, &slot| {
            let module = &self.modules[slot];
            let started = Instant::now();
            let content = module.modify(content, headers);
            metrics::record_module(module.name(), started);
            content
        })
    }

    /// Look up a module by name.
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.slots.get(name).map(|&slot| &self.modules[slot])
    }

    /// Iterate modules in execution order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.order.iter().map(|&slot| &self.modules[slot])
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn reorder(&mut self) {
        let mut order: Vec<usize> = (0..self.modules.len()).collect();
        // Stable sort keeps registration order among equal priorities.
        order.sort_by_key(|&slot| self.modules[slot].priority());
        self.order = order;
    }
}
