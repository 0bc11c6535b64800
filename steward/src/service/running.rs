//! Per-service instance tracking.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use super::{ModuleInstance, ServiceLocale, ServiceState};
use crate::capability::CapabilityKey;
use crate::config::property_keys::is_runtime_key;
use crate::log::Logger;
use crate::module::ModuleHandle;
use crate::monitor::{BootContext, MonitorError, MonitorResult, ServiceRegistry};
use crate::properties::Properties;
use crate::provider::PersistentService;
use crate::{log_debug, log_trace};

struct Inner {
    state: ServiceState,
    /// Every instance created in this service, in creation order
    instances: Vec<Arc<ModuleInstance>>,
    published: HashMap<CapabilityKey, Arc<ModuleInstance>>,
    top_module: Option<Arc<ModuleInstance>>,
    /// Keys being booted and the thread booting each
    in_flight: HashMap<CapabilityKey, ThreadId>,
}

/// A running service: the modules booted inside it and their publication
/// table.
///
/// The free-floating pool is a `RunningService` without a key. It starts
/// active and lives as long as the registry. A named service starts in
/// [`ServiceState::Booting`] and becomes active once its top module is set.
///
/// Module boot and stop run without the service lock held. Concurrent boots
/// of the same key are single-flight: the second caller waits for the first
/// to finish and then takes its result.
pub struct RunningService {
    key: Option<CapabilityKey>,
    provider: Option<Arc<dyn PersistentService>>,
    locale: Mutex<Option<ServiceLocale>>,
    /// Descriptor entries set by modules while the service boots
    property_updates: Mutex<Properties>,
    inner: Mutex<Inner>,
    changed: Condvar,
    wait_timeout: Option<Duration>,
    logger: Arc<dyn Logger>,
}

impl RunningService {
    /// The free-floating pool.
    pub(crate) fn pool(wait_timeout: Option<Duration>, logger: Arc<dyn Logger>) -> Self {
        Self::with_state(None, None, None, ServiceState::Active, wait_timeout, logger)
    }

    /// A named service that has not booted its top module yet.
    pub(crate) fn named(
        key: CapabilityKey,
        provider: Option<Arc<dyn PersistentService>>,
        locale: Option<ServiceLocale>,
        wait_timeout: Option<Duration>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self::with_state(
            Some(key),
            provider,
            locale,
            ServiceState::Booting,
            wait_timeout,
            logger,
        )
    }

    fn with_state(
        key: Option<CapabilityKey>,
        provider: Option<Arc<dyn PersistentService>>,
        locale: Option<ServiceLocale>,
        state: ServiceState,
        wait_timeout: Option<Duration>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            key,
            provider,
            locale: Mutex::new(locale),
            property_updates: Mutex::new(Properties::new()),
            inner: Mutex::new(Inner {
                state,
                instances: Vec::new(),
                published: HashMap::new(),
                top_module: None,
                in_flight: HashMap::new(),
            }),
            changed: Condvar::new(),
            wait_timeout,
            logger,
        }
    }

    /// Service key; `None` for the free-floating pool.
    pub fn key(&self) -> Option<&CapabilityKey> {
        self.key.as_ref()
    }

    pub fn is_pool(&self) -> bool {
        self.key.is_none()
    }

    pub fn provider(&self) -> Option<&Arc<dyn PersistentService>> {
        self.provider.as_ref()
    }

    pub fn locale(&self) -> Option<ServiceLocale> {
        self.locale.lock().clone()
    }

    pub(crate) fn set_locale(&self, locale: ServiceLocale) {
        *self.locale.lock() = Some(locale);
    }

    /// Record a descriptor entry to persist once the top module has booted.
    ///
    /// Only a booting persistent service takes updates, and runtime-only
    /// keys are refused. Returns whether the entry was recorded.
    pub(crate) fn record_property_update(&self, key: &str, value: &str) -> bool {
        if self.provider.is_none() || is_runtime_key(key) {
            return false;
        }
        if self.inner.lock().state != ServiceState::Booting {
            return false;
        }
        self.property_updates.lock().set(key, value);
        true
    }

    /// Entries recorded by [`record_property_update`](Self::record_property_update),
    /// leaving none behind.
    pub(crate) fn take_property_updates(&self) -> Properties {
        std::mem::take(&mut *self.property_updates.lock())
    }

    pub fn state(&self) -> ServiceState {
        self.inner.lock().state
    }

    /// The module the service was booted for, once set.
    pub fn top_module(&self) -> Option<ModuleHandle> {
        self.inner
            .lock()
            .top_module
            .as_ref()
            .map(|m| Arc::clone(m.handle()))
    }

    /// Number of instances currently owned by the service.
    pub fn instance_count(&self) -> usize {
        self.inner.lock().instances.len()
    }

    /// Name to show users: the provider's form of the identifier, or the
    /// identifier itself for a non-persistent service.
    pub fn user_service_name(&self) -> Option<String> {
        let identifier = self.key.as_ref()?.identifier()?;
        Some(match &self.provider {
            Some(provider) => provider.user_service_name(identifier),
            None => identifier.to_string(),
        })
    }

    /// Boot, or find, the module serving `key` in this service.
    ///
    /// 1. A published module for `key` is returned as is.
    /// 2. A booted instance that serves `key` and accepts `properties` is
    ///    published under `key` and returned.
    /// 3. Otherwise a fresh implementation is resolved through `registry`,
    ///    booted without the service lock and published. If another boot
    ///    published `key` first, the fresh instance is stopped and the
    ///    winner returned.
    pub fn boot_module(
        self: &Arc<Self>,
        registry: &ServiceRegistry,
        create: bool,
        key: &CapabilityKey,
        properties: Option<&Properties>,
    ) -> MonitorResult<ModuleHandle> {
        let _flight = match self.claim(key)? {
            Claim::Published(handle) => return Ok(handle),
            Claim::Owned(flight) => flight,
        };

        if let Some(handle) = self.share_booted(key, properties) {
            return Ok(handle);
        }

        let (descriptor, handle) = registry
            .resolve_implementation(key.capability(), properties)
            .ok_or_else(|| MonitorError::NoImplementation(key.capability().clone()))?;

        let top_level = self.key.as_ref() == Some(key);
        let instance = Arc::new(ModuleInstance::new(
            handle,
            descriptor.implementation.clone(),
            descriptor.capabilities.clone(),
            key.identifier().map(String::from),
            top_level,
        ));

        {
            let mut inner = self.inner.lock();
            if inner.state.is_stopping() {
                return Err(MonitorError::ShuttingDown);
            }
            inner.instances.push(Arc::clone(&instance));
        }

        log_debug!(
            self.logger,
            "Booting {} for {} (create = {})",
            descriptor.implementation,
            key,
            create
        );
        let ctx = BootContext::new(registry, self);
        let empty = Properties::new();
        let boot_result = instance
            .handle()
            .boot(&ctx, create, properties.unwrap_or(&empty));

        if let Err(source) = boot_result {
            self.remove_instance(&instance);
            return Err(MonitorError::BootFailed {
                implementation: descriptor.implementation,
                source,
            });
        }
        instance.set_booted();

        let (winner, fresh) = {
            let mut inner = self.inner.lock();
            if inner.state.is_stopping() {
                (None, false)
            } else {
                match inner.published.get(key) {
                    Some(existing) => (Some(Arc::clone(existing)), false),
                    None => {
                        inner
                            .published
                            .insert(key.clone(), Arc::clone(&instance));
                        (Some(Arc::clone(&instance)), true)
                    }
                }
            }
        };

        if !fresh {
            self.remove_instance(&instance);
            instance.stop();
        }
        match winner {
            Some(winner) => {
                if !fresh {
                    log_debug!(
                        self.logger,
                        "{} already published, discarded {}",
                        key,
                        descriptor.implementation
                    );
                }
                Ok(Arc::clone(winner.handle()))
            }
            None => Err(MonitorError::ShuttingDown),
        }
    }

    /// Wait out any other thread booting `key`, then either return its
    /// published module or take ownership of the boot.
    fn claim(self: &Arc<Self>, key: &CapabilityKey) -> MonitorResult<Claim> {
        let me = thread::current().id();
        let deadline = self.wait_timeout.map(|t| Instant::now() + t);
        let mut inner = self.inner.lock();
        loop {
            if inner.state.is_stopping() {
                return Err(MonitorError::ShuttingDown);
            }
            if let Some(published) = inner.published.get(key) {
                return Ok(Claim::Published(Arc::clone(published.handle())));
            }
            match inner.in_flight.get(key).copied() {
                None => {
                    inner.in_flight.insert(key.clone(), me);
                    return Ok(Claim::Owned(Some(InFlight {
                        service: Arc::clone(self),
                        key: key.clone(),
                    })));
                }
                // Re-entrant boot from the booting thread.
                Some(owner) if owner == me => return Ok(Claim::Owned(None)),
                Some(_) => {
                    log_trace!(self.logger, "Waiting for concurrent boot of {}", key);
                    match deadline {
                        Some(deadline) => {
                            if self.changed.wait_until(&mut inner, deadline).timed_out() {
                                return Err(MonitorError::BootTimeout(key.clone()));
                            }
                        }
                        None => self.changed.wait(&mut inner),
                    }
                }
            }
        }
    }

    /// Publish an already booted instance serving `key`, if one accepts
    /// `properties`.
    fn share_booted(&self, key: &CapabilityKey, properties: Option<&Properties>) -> Option<ModuleHandle> {
        let candidates: Vec<Arc<ModuleInstance>> = self
            .inner
            .lock()
            .instances
            .iter()
            .filter(|i| i.is_booted() && i.serves(key))
            .cloned()
            .collect();

        let found = candidates
            .into_iter()
            .find(|i| i.handle().can_support(properties))?;

        let mut inner = self.inner.lock();
        let winner = inner
            .published
            .entry(key.clone())
            .or_insert(found);
        Some(Arc::clone(winner.handle()))
    }

    fn remove_instance(&self, instance: &Arc<ModuleInstance>) {
        let mut inner = self.inner.lock();
        inner.instances.retain(|i| !Arc::ptr_eq(i, instance));
    }

    /// Published module for `key`. With `properties`, the module must also
    /// accept them.
    pub fn find_module(&self, key: &CapabilityKey, properties: Option<&Properties>) -> Option<ModuleHandle> {
        let instance = self.inner.lock().published.get(key).cloned()?;
        match properties {
            Some(props) if !instance.handle().can_support(Some(props)) => None,
            _ => Some(Arc::clone(instance.handle())),
        }
    }

    /// Whether `module` was created in this service.
    pub fn in_service(&self, module: &ModuleHandle) -> bool {
        self.inner.lock().instances.iter().any(|i| i.is(module))
    }

    /// Mark `module` as the service's top module and open the service.
    pub(crate) fn set_top_module(&self, module: &ModuleHandle) {
        let mut inner = self.inner.lock();
        let Some(instance) = inner.instances.iter().find(|i| i.is(module)).cloned() else {
            return;
        };
        inner.top_module = Some(instance);
        if inner.state == ServiceState::Booting {
            inner.state = ServiceState::Active;
        }
        self.changed.notify_all();
    }

    /// Whether this service could be the service `other` names. Never
    /// blocks on boot.
    pub fn is_potential_service(&self, other: &CapabilityKey) -> bool {
        let top = self.inner.lock().top_module.clone();
        self.matches(top.as_ref(), other)
    }

    fn matches(&self, top: Option<&Arc<ModuleInstance>>, other: &CapabilityKey) -> bool {
        let Some(own) = &self.key else {
            return false;
        };
        let Some(other_name) = other.identifier() else {
            return false;
        };

        let other_canonical = match &self.provider {
            None => other_name.to_string(),
            Some(provider) => match provider.canonical_service_name(other_name) {
                Ok(found) => match found.canonical() {
                    Some(canonical) => canonical.to_string(),
                    None => return false,
                },
                Err(_) => return false,
            },
        };

        if let Some(top) = top {
            return top.is_type_and_name(self.provider.as_ref(), other.capability(), &other_canonical);
        }
        if own.capability() != other.capability() {
            return false;
        }
        let Some(own_name) = own.identifier() else {
            return false;
        };
        match &self.provider {
            Some(provider) => provider.is_same_service(own_name, &other_canonical),
            None => own_name == other_canonical,
        }
    }

    /// Whether this service is `other` and open for business.
    ///
    /// Blocks while the service is still booting. Returns false once the
    /// service shuts down or if it turns out not to match.
    pub fn is_active_service(&self, other: &CapabilityKey) -> MonitorResult<bool> {
        let deadline = self.wait_timeout.map(|t| Instant::now() + t);
        let mut inner = self.inner.lock();
        loop {
            if inner.state.is_stopping() {
                return Ok(false);
            }
            let top = inner.top_module.clone();
            if !self.matches(top.as_ref(), other) {
                return Ok(false);
            }
            if top.is_some() {
                return Ok(true);
            }
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut inner, deadline).timed_out() {
                        return Err(MonitorError::BootTimeout(other.clone()));
                    }
                }
                None => self.changed.wait(&mut inner),
            }
        }
    }

    /// Whether the top module has been set and shutdown has not begun.
    pub fn is_active(&self) -> bool {
        let inner = self.inner.lock();
        inner.top_module.is_some() && !inner.state.is_stopping()
    }

    /// Stop every instance in creation order. Returns false if shutdown had
    /// already started.
    pub fn shutdown(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state.is_stopping() {
                return false;
            }
            inner.state = ServiceState::ShuttingDown;
            inner.published.clear();
            self.changed.notify_all();
        }

        loop {
            let next = {
                let mut inner = self.inner.lock();
                if inner.instances.is_empty() {
                    break;
                }
                inner.instances.remove(0)
            };
            if next.stop() {
                log_trace!(self.logger, "Stopped {}", next.implementation());
            }
        }

        let mut inner = self.inner.lock();
        inner.state = ServiceState::Shutdown;
        inner.top_module = None;
        self.changed.notify_all();
        true
    }
}

impl std::fmt::Debug for RunningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningService")
            .field("key", &self.key)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

enum Claim {
    Published(ModuleHandle),
    /// The caller boots the key; `None` for a re-entrant boot
    Owned(Option<InFlight>),
}

/// Releases a boot claim and wakes waiters when dropped.
struct InFlight {
    service: Arc<RunningService>,
    key: CapabilityKey,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut inner = self.service.inner.lock();
        inner.in_flight.remove(&self.key);
        self.service.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ImplementationRegistry;
    use crate::config::ConfigFile;
    use crate::log::NoOpLogger;
    use crate::module::{same_module, Module, ModuleError, Severity};
    use crate::monitor::RegistryBuilder;
    use tempfile::TempDir;

    struct Quiet;
    impl Module for Quiet {}

    struct Refusing;
    impl Module for Refusing {
        fn boot(&self, _ctx: &BootContext<'_>, _create: bool, _properties: &Properties) -> Result<(), ModuleError> {
            Err(ModuleError::new(Severity::Service, "refused"))
        }
    }

    fn test_registry(home: &TempDir) -> Arc<ServiceRegistry> {
        let mut implementations = ImplementationRegistry::new();
        implementations.register_module("test.quiet", ["Quiet"], || Ok(Quiet));
        implementations.register_module("test.refusing", ["Refusing"], || Ok(Refusing));

        let mut config = ConfigFile::default();
        config.system.home = Some(home.path().to_path_buf());
        RegistryBuilder::new(config)
            .skip_process_properties()
            .implementations(implementations)
            .logger(Arc::new(NoOpLogger))
            .boot_property("steward.module.quiet", "test.quiet")
            .boot_property("steward.module.refusing", "test.refusing")
            .build()
            .unwrap()
    }

    fn named(capability: &str, name: &str) -> (Arc<RunningService>, CapabilityKey) {
        let key = CapabilityKey::named(capability, name);
        let service = RunningService::named(key.clone(), None, None, None, Arc::new(NoOpLogger));
        (Arc::new(service), key)
    }

    #[test]
    fn test_shutdown_only_once() {
        let (service, _) = named("Quiet", "db");
        assert_eq!(service.state(), ServiceState::Booting);

        assert!(service.shutdown());
        assert_eq!(service.state(), ServiceState::Shutdown);
        assert!(!service.shutdown(), "second shutdown reports nothing to do");
    }

    #[test]
    fn test_boot_after_shutdown_is_rejected() {
        let home = TempDir::new().unwrap();
        let registry = test_registry(&home);
        let (service, key) = named("Quiet", "db");

        service.shutdown();
        assert!(matches!(
            service.boot_module(&registry, false, &key, None),
            Err(MonitorError::ShuttingDown)
        ));
        assert_eq!(service.instance_count(), 0);
    }

    #[test]
    fn test_boot_publishes_once() {
        let home = TempDir::new().unwrap();
        let registry = test_registry(&home);
        let (service, key) = named("Quiet", "db");

        let first = service.boot_module(&registry, false, &key, None).unwrap();
        let again = service.boot_module(&registry, false, &key, None).unwrap();
        assert!(same_module(&first, &again));
        assert_eq!(service.instance_count(), 1);

        service.set_top_module(&first);
        assert_eq!(service.state(), ServiceState::Active);
        assert!(service.is_active_service(&key).unwrap());
    }

    #[test]
    fn test_failed_boot_is_never_active() {
        let home = TempDir::new().unwrap();
        let registry = test_registry(&home);
        let (service, key) = named("Refusing", "db");

        let err = service.boot_module(&registry, false, &key, None).unwrap_err();
        assert!(matches!(err, MonitorError::BootFailed { .. }));
        assert_eq!(service.instance_count(), 0, "failed instance removed");
        assert!(service.find_module(&key, None).is_none());

        service.shutdown();
        assert!(!service.is_active_service(&key).unwrap());
        assert!(!service.is_active());
    }
}
