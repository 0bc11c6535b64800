//! Execution contexts.
//!
//! Work done on behalf of the registry runs under a [`ContextManager`], a
//! stack of [`Context`]s that is unwound when an error escapes. Service boot
//! pushes a [`ServiceBootContext`] through a [`ContextScope`]; modules booted
//! inside may push their own contexts to be cleaned up if the boot fails.
//!
//! The [`ContextService`] tracks every live manager so that registry
//! shutdown can interrupt threads still working inside it.

mod manager;
mod service;

pub use manager::ContextManager;
pub use service::{ContextScope, ContextService};

use crate::module::Severity;

/// One frame on a context manager's stack.
pub trait Context: Send {
    fn name(&self) -> &str;

    /// Clean up after an error of `severity`. Return true to be removed
    /// from the stack.
    fn cleanup_on_error(&mut self, severity: Severity) -> bool;
}

/// Marks a service boot in progress. Always removed on error.
#[derive(Debug, Default)]
pub struct ServiceBootContext;

impl Context for ServiceBootContext {
    fn name(&self) -> &str {
        "ServiceBoot"
    }

    fn cleanup_on_error(&mut self, _severity: Severity) -> bool {
        true
    }
}
