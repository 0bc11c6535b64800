//! The service registry.

use parking_lot::Mutex;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::daemon::{DaemonHandle, DaemonSignal};
use super::{MonitorError, MonitorResult};
use crate::capability::{CapabilityId, CapabilityKey};
use crate::catalog::{local_catalog, AssemblyEnv, CatalogSet, ImplementationDescriptor, ImplementationRegistry};
use crate::config::property_keys::{
    DELETE_ON_CREATE, DELETE_ROOT_ON_ERROR, IN_RESTORE, NO_AUTO_BOOT, SERVICE_DIRECTORY,
    SERVICE_LOCALE, SERVICE_PREFIX, SERVICE_PROTOCOL, SERVICE_ROOT, SERVICE_TYPE, TERRITORY,
};
use crate::context::{ContextScope, ContextService, ServiceBootContext};
use crate::env::{EnvAccess, PermissionCheck, PlatformInfo};
use crate::log::Logger;
use crate::module::{ModuleHandle, Severity};
use crate::properties::Properties;
use crate::provider::{scheme_of, PersistentService, ServiceProviderRegistry};
use crate::service::{RunningService, ServiceLocale};
use crate::{log_debug, log_error, log_info, log_warn};

/// Result of booting a named service.
pub enum BootOutcome {
    /// The service was booted; its top module
    Started(ModuleHandle),
    /// A service under the same key is already running
    AlreadyExists,
}

impl BootOutcome {
    pub fn handle(&self) -> Option<&ModuleHandle> {
        match self {
            BootOutcome::Started(handle) => Some(handle),
            BootOutcome::AlreadyExists => None,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, BootOutcome::Started(_))
    }
}

impl fmt::Debug for BootOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootOutcome::Started(_) => f.write_str("Started(..)"),
            BootOutcome::AlreadyExists => f.write_str("AlreadyExists"),
        }
    }
}

struct ServiceTable {
    /// Named services in boot order
    services: Vec<Arc<RunningService>>,
    in_shutdown: bool,
}

/// Everything [`RegistryBuilder`](super::RegistryBuilder) hands over.
pub(crate) struct RegistryParts {
    pub catalogs: CatalogSet,
    pub providers: ServiceProviderRegistry,
    pub implementations: Arc<ImplementationRegistry>,
    pub platform: PlatformInfo,
    pub system_home: PathBuf,
    pub application: Properties,
    pub default_locale: String,
    pub wait_timeout: Option<Duration>,
    pub permissions: PermissionCheck,
    pub logger: Arc<dyn Logger>,
}

/// Registry of implementations, providers and running services.
///
/// Modules outside any named service live in the free-floating pool. Named
/// services are either non-persistent (identified by name only) or
/// persistent (owned by a [`PersistentService`] provider with a durable
/// root and descriptor).
///
/// The registry lock covers only the service list. Module boot and stop
/// never run under it.
pub struct ServiceRegistry {
    table: Mutex<ServiceTable>,
    pool: Arc<RunningService>,
    catalogs: CatalogSet,
    providers: ServiceProviderRegistry,
    implementations: Arc<ImplementationRegistry>,
    contexts: ContextService,
    platform: PlatformInfo,
    system_home: PathBuf,
    application: Properties,
    default_locale: String,
    wait_timeout: Option<Duration>,
    permissions: PermissionCheck,
    daemons: Mutex<Vec<DaemonHandle>>,
    logger: Arc<dyn Logger>,
}

impl ServiceRegistry {
    pub(crate) fn from_parts(parts: RegistryParts) -> Self {
        let pool = Arc::new(RunningService::pool(
            parts.wait_timeout,
            Arc::clone(&parts.logger),
        ));
        Self {
            table: Mutex::new(ServiceTable {
                services: Vec::new(),
                in_shutdown: false,
            }),
            pool,
            catalogs: parts.catalogs,
            providers: parts.providers,
            implementations: parts.implementations,
            contexts: ContextService::new(),
            platform: parts.platform,
            system_home: parts.system_home,
            application: parts.application,
            default_locale: parts.default_locale,
            wait_timeout: parts.wait_timeout,
            permissions: parts.permissions,
            daemons: Mutex::new(Vec::new()),
            logger: parts.logger,
        }
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn catalogs(&self) -> &CatalogSet {
        &self.catalogs
    }

    pub fn providers(&self) -> &ServiceProviderRegistry {
        &self.providers
    }

    pub fn implementations(&self) -> &ImplementationRegistry {
        &self.implementations
    }

    pub fn contexts(&self) -> &ContextService {
        &self.contexts
    }

    pub fn platform(&self) -> PlatformInfo {
        self.platform
    }

    pub fn system_home(&self) -> &Path {
        &self.system_home
    }

    /// Properties read from the application property file.
    pub fn application_properties(&self) -> &Properties {
        &self.application
    }

    /// The free-floating pool.
    pub fn pool(&self) -> &Arc<RunningService> {
        &self.pool
    }

    /// Snapshot of the named services in boot order.
    pub fn services(&self) -> Vec<Arc<RunningService>> {
        self.table.lock().services.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.table.lock().in_shutdown
    }

    fn assembly_env(&self) -> AssemblyEnv<'_> {
        AssemblyEnv {
            implementations: &self.implementations,
            platform: self.platform,
            logger: &self.logger,
        }
    }

    /// Find and instantiate an implementation of `capability`. Module
    /// entries in `properties` are consulted before the assembled catalogs.
    pub(crate) fn resolve_implementation(
        &self,
        capability: &CapabilityId,
        properties: Option<&Properties>,
    ) -> Option<(ImplementationDescriptor, ModuleHandle)> {
        let local = properties.and_then(|p| local_catalog(p, &self.assembly_env()));
        self.catalogs
            .resolve(capability, properties, local.as_ref(), &self.logger)
    }

    /// The service `module` was created in; the pool when `module` is
    /// `None`.
    fn find_top_service(&self, module: Option<&ModuleHandle>) -> Option<Arc<RunningService>> {
        match module {
            None => Some(Arc::clone(&self.pool)),
            Some(module) => self.find_owner(module),
        }
    }

    /// The named service `module` was created in.
    fn find_owner(&self, module: &ModuleHandle) -> Option<Arc<RunningService>> {
        self.table
            .lock()
            .services
            .iter()
            .find(|s| s.in_service(module))
            .cloned()
    }

    /// Boot `key` inside `service`. A failure of service severity or worse
    /// takes a named service down with it.
    pub(crate) fn start_module_in(
        &self,
        service: &Arc<RunningService>,
        create: bool,
        key: &CapabilityKey,
        properties: Option<&Properties>,
    ) -> MonitorResult<ModuleHandle> {
        service
            .boot_module(self, create, key, properties)
            .inspect_err(|e| {
                if service.is_pool() || e.severity() < Severity::Service {
                    return;
                }
                if self.shutdown_running(service) {
                    log_warn!(
                        self.logger,
                        "Shut down service {} after failure: {}",
                        service.user_service_name().unwrap_or_default(),
                        e
                    );
                }
            })
    }

    /// Boot, or find, a module serving `capability` in the service that
    /// owns `owner`, or in the pool.
    pub fn start_module(
        &self,
        create: bool,
        owner: Option<&ModuleHandle>,
        capability: impl Into<CapabilityId>,
        identifier: Option<&str>,
        properties: Option<&Properties>,
    ) -> MonitorResult<ModuleHandle> {
        let service = self
            .find_top_service(owner)
            .ok_or(MonitorError::UnknownOwner)?;
        let key = CapabilityKey::new(capability, identifier);
        self.start_module_in(&service, create, &key, properties)
    }

    /// A module already published in the service that owns `owner`, or in
    /// the pool.
    pub fn find_module(
        &self,
        owner: Option<&ModuleHandle>,
        capability: impl Into<CapabilityId>,
        identifier: Option<&str>,
    ) -> Option<ModuleHandle> {
        let service = self.find_top_service(owner)?;
        service.find_module(&CapabilityKey::new(capability, identifier), None)
    }

    /// Boot, or find, a pool module.
    pub fn start_system_module(&self, capability: impl Into<CapabilityId>) -> MonitorResult<ModuleHandle> {
        self.start_module(false, None, capability, None, None)
    }

    /// A pool module that must already be running.
    pub fn find_system_module(&self, capability: impl Into<CapabilityId>) -> MonitorResult<ModuleHandle> {
        let capability = capability.into();
        self.find_module(None, capability.clone(), None)
            .ok_or(MonitorError::NoImplementation(capability))
    }

    /// A pool module, if running.
    pub fn get_system_module(&self, capability: impl Into<CapabilityId>) -> Option<ModuleHandle> {
        self.find_module(None, capability, None)
    }

    /// Instantiate a registered module by name without booting it.
    pub fn new_instance_from_identifier(&self, name: &str) -> MonitorResult<ModuleHandle> {
        self.implementations.new_instance(name)
    }

    /// Top module of the running service of `capability` called `name`.
    ///
    /// Waits for a service that is still booting. `None` if no such service
    /// runs or it fails to come up.
    pub fn find_service(&self, capability: impl Into<CapabilityId>, name: &str) -> Option<ModuleHandle> {
        let key = CapabilityKey::named(capability, name);
        let candidate = self
            .table
            .lock()
            .services
            .iter()
            .find(|s| s.is_potential_service(&key))
            .cloned()?;

        match candidate.is_active_service(&key) {
            Ok(true) => candidate.top_module(),
            Ok(false) => None,
            Err(e) => {
                log_warn!(self.logger, "Gave up on {}: {}", key, e);
                None
            }
        }
    }

    /// User-facing names of the active services of `capability`.
    pub fn get_service_list(&self, capability: impl Into<CapabilityId>) -> Vec<String> {
        let capability = capability.into();
        self.table
            .lock()
            .services
            .iter()
            .filter(|s| s.is_active() && s.key().is_some_and(|k| *k.capability() == capability))
            .filter_map(|s| s.user_service_name())
            .collect()
    }

    /// Boot a service that has no durable root. If a service of the same
    /// key is already running, its top module is returned.
    pub fn start_non_persistent_service(
        &self,
        capability: impl Into<CapabilityId>,
        name: &str,
        properties: Option<&Properties>,
    ) -> MonitorResult<ModuleHandle> {
        let capability = capability.into();
        match self.boot_service(None, &capability, name, properties, false)? {
            BootOutcome::Started(handle) => Ok(handle),
            BootOutcome::AlreadyExists => self
                .find_service(capability.clone(), name)
                .ok_or_else(|| MonitorError::ServiceAlreadyExists(CapabilityKey::named(capability, name))),
        }
    }

    /// Create a persistent service: materialize its root through the
    /// provider that owns `name`'s scheme, boot it, and persist its
    /// descriptor.
    ///
    /// Runtime keys in `properties` (`steward.__rt.*`) steer the create and
    /// are never persisted. On failure nothing is left behind.
    pub fn create_persistent_service(
        &self,
        capability: impl Into<CapabilityId>,
        name: &str,
        properties: Option<&Properties>,
    ) -> MonitorResult<BootOutcome> {
        let provider = self
            .providers
            .find_provider_for_create(name)?
            .ok_or_else(|| MonitorError::UnknownProtocol(name.to_string()))?;
        self.boot_service(Some(provider), &capability.into(), name, properties, true)
    }

    /// Boot the existing persistent service called `name`.
    ///
    /// Returns false when no provider recognizes the name at all, true
    /// otherwise, including when the scheme is recognized but holds no
    /// such service.
    pub fn start_persistent_service(&self, name: &str, properties: Option<&Properties>) -> MonitorResult<bool> {
        self.find_provider_and_start(name, properties, false)
    }

    fn find_provider_and_start(
        &self,
        name: &str,
        properties: Option<&Properties>,
        boot_time: bool,
    ) -> MonitorResult<bool> {
        if let Some(scheme) = scheme_of(name).filter(|s| !s.is_empty()) {
            let candidates = self.providers.providers_for_scheme(scheme)?;
            if !candidates.is_empty() {
                let mut claims = Vec::new();
                for provider in candidates {
                    let Some(canonical) = ServiceProviderRegistry::canonicalize(provider.as_ref(), name)?
                    else {
                        continue;
                    };
                    if let Some(descriptor) = provider.service_properties(&canonical, properties)? {
                        claims.push((provider, canonical, descriptor));
                    }
                }
                if claims.len() > 1 {
                    return Err(MonitorError::AmbiguousProtocol(name.to_string()));
                }
                let Some((provider, canonical, descriptor)) = claims.pop() else {
                    return Ok(true);
                };
                if boot_time && descriptor.get_bool(NO_AUTO_BOOT) {
                    return Ok(true);
                }
                self.start_provider_service(provider, &canonical, &descriptor)?;
                return Ok(true);
            }
        }

        let mut chosen: Option<(Arc<dyn PersistentService>, String, MonitorResult<Properties>)> = None;
        for provider in self.providers.enumerate(properties) {
            let Some(canonical) = ServiceProviderRegistry::canonicalize(provider.as_ref(), name)? else {
                continue;
            };
            let descriptor = match provider.service_properties(&canonical, properties) {
                Ok(Some(descriptor)) => Ok(descriptor),
                Ok(None) => continue,
                Err(e) => Err(e),
            };
            if chosen.is_some() {
                return Err(MonitorError::AmbiguousProtocol(name.to_string()));
            }
            chosen = Some((provider, canonical, descriptor));
        }

        let Some((provider, canonical, descriptor)) = chosen else {
            return Ok(scheme_of(name).is_none());
        };
        let descriptor = descriptor?;
        if boot_time && descriptor.get_bool(NO_AUTO_BOOT) {
            return Ok(true);
        }
        self.start_provider_service(provider, &canonical, &descriptor)?;
        Ok(true)
    }

    fn start_provider_service(
        &self,
        provider: Arc<dyn PersistentService>,
        canonical: &str,
        descriptor: &Properties,
    ) -> MonitorResult<BootOutcome> {
        let capability = descriptor
            .get(SERVICE_PROTOCOL)
            .ok_or_else(|| MonitorError::PropertyMissing(SERVICE_PROTOCOL.to_string()))?;
        let capability = CapabilityId::new(capability);
        self.boot_service(Some(provider), &capability, canonical, Some(descriptor), false)
    }

    /// Delete the durable root of the persistent service called `name`.
    pub fn remove_persistent_service(&self, name: &str) -> MonitorResult<()> {
        let unknown = || MonitorError::UnknownProtocol(name.to_string());
        let provider = self.providers.find_provider_for_create(name)?.ok_or_else(unknown)?;
        let found = provider.canonical_service_name(name)?;
        let canonical = found.canonical().ok_or_else(unknown)?;

        if !provider.remove_service_root(canonical) {
            return Err(MonitorError::ServiceRootRemoval {
                name: canonical.to_string(),
                reason: "provider could not remove the root".to_string(),
            });
        }
        log_info!(self.logger, "Removed service root {}", canonical);
        Ok(())
    }

    /// Canonical form of `name` under the provider that would create it.
    pub fn get_canonical_service_name(&self, name: &str) -> MonitorResult<Option<String>> {
        let Some(provider) = self.providers.find_provider_for_create(name)? else {
            return Ok(None);
        };
        Ok(provider
            .canonical_service_name(name)?
            .canonical()
            .map(String::from))
    }

    /// User-facing name of the service `module` was created in.
    pub fn get_service_name(&self, module: &ModuleHandle) -> Option<String> {
        self.find_owner(module)?.user_service_name()
    }

    /// Provider of the service `module` was created in; `None` for a
    /// non-persistent service.
    pub fn get_service_type(&self, module: &ModuleHandle) -> Option<Arc<dyn PersistentService>> {
        self.find_owner(module)?.provider().cloned()
    }

    /// Locale of the service `module` was created in.
    pub fn get_locale(&self, module: &ModuleHandle) -> Option<ServiceLocale> {
        self.find_owner(module)?.locale()
    }

    /// Change the locale of the service `module` belongs to and record it
    /// in the service descriptor.
    ///
    /// The description is validated even when `module` belongs to no
    /// persistent service; nothing is written then.
    pub fn set_locale(&self, module: &ModuleHandle, description: &str) -> MonitorResult<ServiceLocale> {
        let locale = ServiceLocale::parse(description)?;
        let Some(service) = self.find_owner(module) else {
            return Ok(locale);
        };
        let (Some(provider), Some(canonical)) = (
            service.provider(),
            service.key().and_then(|k| k.identifier()),
        ) else {
            return Ok(locale);
        };

        let mut descriptor = provider
            .service_properties(canonical, None)?
            .ok_or_else(|| MonitorError::PropertyMissing(SERVICE_PROTOCOL.to_string()))?;
        descriptor.set(SERVICE_LOCALE, locale.to_string());
        provider.save_service_properties(canonical, &descriptor.without_runtime(), true)?;
        service.set_locale(locale.clone());
        Ok(locale)
    }

    fn apply_locale(&self, properties: &mut Properties) -> MonitorResult<ServiceLocale> {
        let locale = match properties.get(TERRITORY) {
            Some(territory) => ServiceLocale::parse(territory)?,
            None => ServiceLocale::parse(&self.default_locale)?,
        };
        properties.set(SERVICE_LOCALE, locale.to_string());
        Ok(locale)
    }

    /// Register and boot a named service.
    fn boot_service(
        &self,
        provider: Option<Arc<dyn PersistentService>>,
        capability: &CapabilityId,
        name: &str,
        properties: Option<&Properties>,
        create: bool,
    ) -> MonitorResult<BootOutcome> {
        let mut name = match &provider {
            Some(provider) => provider
                .canonical_service_name(name)?
                .canonical()
                .map(String::from)
                .ok_or_else(|| MonitorError::UnknownProtocol(name.to_string()))?,
            None => name.to_string(),
        };
        let mut key = CapabilityKey::named(capability.clone(), name.as_str());

        let (service, mut properties) = {
            let mut table = self.table.lock();
            if table.in_shutdown {
                return Err(MonitorError::ShuttingDown);
            }
            if table.services.iter().any(|s| s.is_potential_service(&key)) {
                return Ok(BootOutcome::AlreadyExists);
            }

            let mut locale = None;
            let properties = if create {
                let provider = provider
                    .as_ref()
                    .ok_or_else(|| MonitorError::UnknownProtocol(name.clone()))?;
                let mut layered = Properties::layered(Arc::new(properties.cloned().unwrap_or_default()));
                locale = Some(self.apply_locale(&mut layered)?);
                layered.set(SERVICE_PROTOCOL, capability.as_str());

                name = provider.create_service_root(&name, layered.get_bool(DELETE_ON_CREATE))?;
                key = CapabilityKey::named(capability.clone(), name.as_str());
                Some(layered)
            } else {
                if let Some(description) = properties.and_then(|p| p.get(SERVICE_LOCALE)) {
                    locale = Some(ServiceLocale::parse(description)?);
                }
                properties.cloned()
            };

            let service = Arc::new(RunningService::named(
                key.clone(),
                provider.clone(),
                locale,
                self.wait_timeout,
                Arc::clone(&self.logger),
            ));
            table.services.push(Arc::clone(&service));
            (service, properties)
        };

        if let Some(props) = properties.as_mut() {
            props.set(SERVICE_ROOT, name.as_str());
            if let Some(provider) = &provider {
                props.set(SERVICE_TYPE, provider.scheme());
            }
        }

        log_debug!(self.logger, "Booting service {} (create = {})", key, create);
        let scope = ContextScope::enter(&self.contexts, Box::new(ServiceBootContext));
        let booted = self.boot_top_module(
            &service,
            provider.as_ref(),
            create,
            &key,
            &name,
            properties.as_ref(),
        );

        match booted {
            Ok(handle) => {
                scope.complete();
                service.set_top_module(&handle);
                log_info!(self.logger, "Booted service {}", key);
                Ok(BootOutcome::Started(handle))
            }
            Err(e) => {
                scope.fail(e.severity().max(Severity::Service));
                log_error!(self.logger, "Failed to boot service {}: {}", key, e);

                service.shutdown();
                let delete_root = create
                    || properties
                        .as_ref()
                        .is_some_and(|p| p.contains_key(DELETE_ROOT_ON_ERROR));
                if let (true, Some(provider)) = (delete_root, &provider) {
                    if !provider.remove_service_root(&name) {
                        log_warn!(self.logger, "Could not remove service root {}", name);
                    }
                }
                self.table
                    .lock()
                    .services
                    .retain(|s| !Arc::ptr_eq(s, &service));
                Err(e)
            }
        }
    }

    fn boot_top_module(
        &self,
        service: &Arc<RunningService>,
        provider: Option<&Arc<dyn PersistentService>>,
        create: bool,
        key: &CapabilityKey,
        name: &str,
        properties: Option<&Properties>,
    ) -> MonitorResult<ModuleHandle> {
        let handle = service.boot_module(self, create, key, properties)?;
        let updates = service.take_property_updates();
        let Some(provider) = provider else {
            return Ok(handle);
        };

        let in_restore = properties.is_some_and(|p| p.contains_key(IN_RESTORE));
        if let (true, Some(props)) = (create || in_restore, properties) {
            let mut descriptor = props.without_runtime();
            for (k, v) in updates.iter() {
                descriptor.set(k, v);
            }
            provider.save_service_properties(name, &descriptor, false)?;
        } else if !updates.is_empty() {
            let mut descriptor = provider
                .service_properties(name, None)?
                .ok_or_else(|| MonitorError::PropertyMissing(SERVICE_PROTOCOL.to_string()))?;
            for (k, v) in updates.iter() {
                descriptor.set(k, v);
            }
            provider.save_service_properties(name, &descriptor.without_runtime(), true)?;
        }
        Ok(handle)
    }

    /// Start the services named by `steward.service.<name>` entries.
    ///
    /// `<capability>` values boot a non-persistent service of that name. The
    /// value `serviceDirectory` boots the persistent service of that name,
    /// only when `boot_all` is set. Failures are logged, never returned.
    pub fn start_services(&self, properties: &Properties, boot_all: bool) {
        let flat = properties.flattened();
        for (name, value) in flat.with_prefix(SERVICE_PREFIX) {
            let result = if value == SERVICE_DIRECTORY {
                if !boot_all {
                    continue;
                }
                self.find_provider_and_start(name, Some(&flat), true).map(|_| ())
            } else {
                self.boot_service(None, &CapabilityId::new(value), name, None, false)
                    .map(|_| ())
            };
            if let Err(e) = result {
                log_error!(self.logger, "Failed to start service {}: {}", name, e);
            }
        }
    }

    /// Boot every persistent service the providers know about, except those
    /// marked `steward.database.noAutoBoot`. Returns how many were booted.
    pub fn boot_persistent_services(&self) -> usize {
        let mut booted = 0;
        for provider in self.providers.enumerate(Some(&self.application)) {
            let names = match provider.boot_time_services() {
                Ok(names) => names,
                Err(e) => {
                    log_warn!(
                        self.logger,
                        "Cannot list services of scheme '{}': {}",
                        provider.scheme(),
                        e
                    );
                    continue;
                }
            };
            for name in names {
                let descriptor = match provider.service_properties(&name, None) {
                    Ok(Some(descriptor)) => descriptor,
                    Ok(None) => continue,
                    Err(e) => {
                        log_warn!(self.logger, "Cannot read descriptor of {}: {}", name, e);
                        continue;
                    }
                };
                if descriptor.get_bool(NO_AUTO_BOOT) {
                    log_debug!(self.logger, "Skipping {}: auto boot disabled", name);
                    continue;
                }
                match self.start_provider_service(Arc::clone(&provider), &name, &descriptor) {
                    Ok(BootOutcome::Started(_)) => booted += 1,
                    Ok(BootOutcome::AlreadyExists) => {}
                    Err(e) => log_error!(self.logger, "Failed to boot {}: {}", name, e),
                }
            }
        }
        booted
    }

    /// Canonical names of every persistent service the providers can list,
    /// paired with the provider's scheme.
    pub fn persistent_services(&self) -> Vec<(String, String)> {
        let mut found = Vec::new();
        for provider in self.providers.enumerate(Some(&self.application)) {
            match provider.boot_time_services() {
                Ok(names) => found.extend(
                    names
                        .into_iter()
                        .map(|n| (provider.scheme().to_string(), provider.user_service_name(&n))),
                ),
                Err(e) => log_warn!(
                    self.logger,
                    "Cannot list services of scheme '{}': {}",
                    provider.scheme(),
                    e
                ),
            }
        }
        found
    }

    /// Run `task` on a named background thread owned by the registry.
    ///
    /// The task receives a [`DaemonSignal`] and should return once it is
    /// stopped; shutdown waits for it. Tasks that need the registry should
    /// hold a `Weak` reference so they do not keep it alive.
    pub fn spawn_daemon<F>(&self, name: impl Into<String>, task: F) -> MonitorResult<()>
    where
        F: FnOnce(DaemonSignal) + Send + 'static,
    {
        let name = name.into();
        let access = EnvAccess::SpawnThread(name.clone());
        if !(self.permissions)(&access) {
            return Err(MonitorError::PermissionDenied(access.to_string()));
        }
        if self.is_shut_down() {
            return Err(MonitorError::ShuttingDown);
        }

        let signal = DaemonSignal::default();
        let task_signal = signal.clone();
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || task(task_signal))
            .map_err(|source| MonitorError::DaemonSpawn {
                name: name.clone(),
                source,
            })?;

        log_debug!(self.logger, "Started daemon thread '{}'", name);
        self.daemons
            .lock()
            .push(DaemonHandle::new(name, signal, thread));
        Ok(())
    }

    /// Names of the daemon threads still running.
    pub fn daemon_names(&self) -> Vec<String> {
        self.daemons
            .lock()
            .iter()
            .filter(|d| !d.is_finished())
            .map(|d| d.name().to_string())
            .collect()
    }

    /// Shut down the service `module` belongs to. Returns false if `module`
    /// belongs to no named service or the service was already stopping.
    pub fn shutdown_service(&self, module: &ModuleHandle) -> bool {
        match self.find_owner(module) {
            Some(service) => self.shutdown_running(&service),
            None => false,
        }
    }

    fn shutdown_running(&self, service: &Arc<RunningService>) -> bool {
        if !service.shutdown() {
            return false;
        }
        self.table
            .lock()
            .services
            .retain(|s| !Arc::ptr_eq(s, service));
        true
    }

    /// Shut everything down: interrupt live contexts, stop daemons, shut
    /// named services down newest first, then the pool.
    ///
    /// Idempotent. Afterwards every boot fails with
    /// [`MonitorError::ShuttingDown`].
    pub fn shutdown(&self) {
        {
            let mut table = self.table.lock();
            if table.in_shutdown {
                return;
            }
            table.in_shutdown = true;
        }

        let interrupted = self.contexts.notify_all_active();
        log_info!(
            self.logger,
            "Shutting down service registry ({} active context(s))",
            interrupted
        );

        let daemons = std::mem::take(&mut *self.daemons.lock());
        for mut daemon in daemons {
            if !daemon.stop_and_join() {
                log_warn!(self.logger, "Daemon thread '{}' panicked", daemon.name());
            }
        }

        loop {
            let Some(service) = self.table.lock().services.pop() else {
                break;
            };
            if service.shutdown() {
                log_debug!(
                    self.logger,
                    "Shut down service {}",
                    service.user_service_name().unwrap_or_default()
                );
            }
        }
        self.pool.shutdown();
        log_info!(self.logger, "Service registry shut down");
    }

    /// Operator summary of the catalogs, exclusions and scheme table.
    pub fn catalog_summary(&self) -> String {
        let mut out = String::new();
        for catalog in self.catalogs.catalogs() {
            let _ = writeln!(out, "[{}] {}", catalog.kind(), catalog.origin());
            for d in catalog.descriptors() {
                let capabilities: Vec<&str> = d.capabilities.iter().map(|c| c.as_str()).collect();
                let _ = writeln!(
                    out,
                    "  {} = {} ({}) rank {}",
                    d.tag,
                    d.implementation,
                    capabilities.join(", "),
                    d.rank()
                );
            }
        }
        if !self.catalogs.excluded().is_empty() {
            let _ = writeln!(out, "excluded:");
            for entry in self.catalogs.excluded() {
                let _ = writeln!(out, "  {}", entry);
            }
        }
        let _ = writeln!(out, "schemes:");
        for provider in self.providers.explicit() {
            let _ = writeln!(out, "  {} (explicit)", provider.scheme());
        }
        for (scheme, implementation) in self.providers.schemes() {
            let _ = writeln!(out, "  {} = {}", scheme, implementation);
        }
        out
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("system_home", &self.system_home)
            .field("platform", &self.platform)
            .field("services", &self.table.lock().services.len())
            .finish_non_exhaustive()
    }
}

impl Drop for ServiceRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
