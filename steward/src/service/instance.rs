//! A module instance owned by a running service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capability::{CapabilityId, CapabilityKey};
use crate::module::{same_module, ModuleHandle};
use crate::provider::PersistentService;

/// A module created inside a service, with its lifecycle flags.
pub struct ModuleInstance {
    handle: ModuleHandle,
    implementation: String,
    capabilities: Vec<CapabilityId>,
    identifier: Option<String>,
    /// Booted as the top module of its service
    top_level: bool,
    booted: AtomicBool,
    stopped: AtomicBool,
}

impl ModuleInstance {
    pub(crate) fn new(
        handle: ModuleHandle,
        implementation: impl Into<String>,
        capabilities: Vec<CapabilityId>,
        identifier: Option<String>,
        top_level: bool,
    ) -> Self {
        Self {
            handle,
            implementation: implementation.into(),
            capabilities,
            identifier,
            top_level,
            booted: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn handle(&self) -> &ModuleHandle {
        &self.handle
    }

    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    pub fn capabilities(&self) -> &[CapabilityId] {
        &self.capabilities
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Whether this is the module a service was booted for.
    pub fn is_top_level(&self) -> bool {
        self.top_level
    }

    pub fn is_booted(&self) -> bool {
        self.booted.load(Ordering::SeqCst)
    }

    pub(crate) fn set_booted(&self) {
        self.booted.store(true, Ordering::SeqCst);
    }

    /// Whether this instance serves `key`: same identifier and one of its
    /// capabilities.
    pub fn serves(&self, key: &CapabilityKey) -> bool {
        self.identifier.as_deref() == key.identifier() && self.capabilities.contains(key.capability())
    }

    /// Whether this instance is a service of `capability` named `other`,
    /// comparing names through `provider` when there is one.
    pub fn is_type_and_name(
        &self,
        provider: Option<&Arc<dyn PersistentService>>,
        capability: &CapabilityId,
        other: &str,
    ) -> bool {
        if !self.capabilities.contains(capability) {
            return false;
        }
        let Some(identifier) = self.identifier.as_deref() else {
            return false;
        };
        match provider {
            Some(provider) => provider.is_same_service(identifier, other),
            None => identifier == other,
        }
    }

    pub fn is(&self, handle: &ModuleHandle) -> bool {
        same_module(&self.handle, handle)
    }

    /// Stop the module if it booted and has not been stopped. Returns
    /// whether `stop` was called.
    pub(crate) fn stop(&self) -> bool {
        if !self.is_booted() {
            return false;
        }
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.handle.stop();
        true
    }
}

impl std::fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("implementation", &self.implementation)
            .field("capabilities", &self.capabilities)
            .field("identifier", &self.identifier)
            .field("top_level", &self.top_level)
            .field("booted", &self.is_booted())
            .finish()
    }
}
