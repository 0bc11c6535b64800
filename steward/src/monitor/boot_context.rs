//! What a module sees while it boots.

use std::sync::Arc;

use super::{MonitorResult, ServiceRegistry};
use crate::capability::{CapabilityId, CapabilityKey};
use crate::context::ContextManager;
use crate::module::ModuleHandle;
use crate::properties::Properties;
use crate::service::RunningService;

/// Handed to [`Module::boot`](crate::module::Module::boot).
///
/// Modules started through the context land in the same service as the
/// module being booted.
pub struct BootContext<'a> {
    registry: &'a ServiceRegistry,
    service: &'a Arc<RunningService>,
}

impl<'a> BootContext<'a> {
    pub(crate) fn new(registry: &'a ServiceRegistry, service: &'a Arc<RunningService>) -> Self {
        Self { registry, service }
    }

    /// Boot, or find, a sibling module serving `capability`.
    pub fn start_module(
        &self,
        create: bool,
        capability: impl Into<CapabilityId>,
        identifier: Option<&str>,
        properties: Option<&Properties>,
    ) -> MonitorResult<ModuleHandle> {
        let key = CapabilityKey::new(capability, identifier);
        self.registry
            .start_module_in(self.service, create, &key, properties)
    }

    /// A sibling module already published in this service.
    pub fn find_module(
        &self,
        capability: impl Into<CapabilityId>,
        identifier: Option<&str>,
    ) -> Option<ModuleHandle> {
        self.service
            .find_module(&CapabilityKey::new(capability, identifier), None)
    }

    pub fn registry(&self) -> &ServiceRegistry {
        self.registry
    }

    pub fn service(&self) -> &Arc<RunningService> {
        self.service
    }

    /// User-facing name of the service being booted; `None` in the pool.
    pub fn service_name(&self) -> Option<String> {
        self.service.user_service_name()
    }

    /// Set an entry in the persisted descriptor of the service being booted.
    ///
    /// The entry is written once the service's top module has booted.
    /// Returns false, recording nothing, for the pool, a non-persistent or
    /// already running service, or a runtime-only key.
    pub fn update_service_property(&self, key: &str, value: &str) -> bool {
        self.service.record_property_update(key, value)
    }

    /// The calling thread's context manager, if a service boot is running.
    pub fn context_manager(&self) -> Option<Arc<ContextManager>> {
        self.registry.contexts().current()
    }
}
