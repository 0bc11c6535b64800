//! Named implementation factories.
//!
//! Catalog property files name implementations by string. The
//! [`ImplementationRegistry`] is the table those names are looked up in: each
//! name maps to a factory for a module, a persistent-service provider or a
//! storage factory that backs a scheme.
//!
//! # Example
//!
//! ```
//! use steward::catalog::ImplementationRegistry;
//! use steward::module::Module;
//!
//! struct StreamLog;
//! impl Module for StreamLog {}
//!
//! let mut implementations = ImplementationRegistry::with_builtins();
//! implementations.register_module("log.stream", ["Logger"], || Ok(StreamLog));
//!
//! assert!(implementations.contains("log.stream"));
//! assert!(implementations.contains("storage.directory"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::capability::CapabilityId;
use crate::module::{Module, ModuleError, ModuleHandle};
use crate::monitor::{MonitorError, MonitorResult};
use crate::provider::{DirectoryService, MemoryService, PersistentService, StorageEnv};

/// Registered name of the directory storage factory.
pub const DIRECTORY_STORAGE: &str = "storage.directory";

/// Registered name of the in-memory storage factory.
pub const MEMORY_STORAGE: &str = "storage.memory";

/// Creates a fresh, unbooted module.
pub type ModuleFactory = Arc<dyn Fn() -> Result<ModuleHandle, ModuleError> + Send + Sync>;

/// Creates a provider that answers to its own fixed scheme.
pub type ProviderFactory =
    Arc<dyn Fn(&StorageEnv) -> MonitorResult<Arc<dyn PersistentService>> + Send + Sync>;

/// Creates a provider for the scheme it is mapped to.
pub type StorageFactory =
    Arc<dyn Fn(&str, &StorageEnv) -> MonitorResult<Arc<dyn PersistentService>> + Send + Sync>;

/// What a registered name stands for.
#[derive(Clone)]
pub enum Implementation {
    /// A module serving the listed capabilities
    Module {
        capabilities: Vec<CapabilityId>,
        factory: ModuleFactory,
    },
    /// An explicit persistent-service provider
    Provider(ProviderFactory),
    /// A storage factory, mapped to schemes by the catalog
    Storage(StorageFactory),
}

impl Implementation {
    /// Short label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Implementation::Module { .. } => "module",
            Implementation::Provider(_) => "provider",
            Implementation::Storage(_) => "storage",
        }
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Module { capabilities, .. } => f
                .debug_struct("Module")
                .field("capabilities", capabilities)
                .finish_non_exhaustive(),
            Implementation::Provider(_) => f.write_str("Provider"),
            Implementation::Storage(_) => f.write_str("Storage"),
        }
    }
}

/// Table of implementations that catalog entries may name.
#[derive(Debug, Clone, Default)]
pub struct ImplementationRegistry {
    entries: BTreeMap<String, Implementation>,
}

impl ImplementationRegistry {
    /// Empty registry. No scheme can be resolved until a storage factory or
    /// provider is registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the directory and in-memory storage factories.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register_storage(DIRECTORY_STORAGE, |scheme, env| {
                Ok(DirectoryService::with_scheme(scheme, env))
            })
            .register_storage(MEMORY_STORAGE, |scheme, _env| {
                Ok(MemoryService::with_scheme(scheme))
            });
        registry
    }

    /// Register a module implementation serving `capabilities`.
    ///
    /// Registering a name twice replaces the earlier entry.
    pub fn register_module<M, F, C>(
        &mut self,
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = C>,
        factory: F,
    ) -> &mut Self
    where
        M: Module,
        F: Fn() -> Result<M, ModuleError> + Send + Sync + 'static,
        C: Into<CapabilityId>,
    {
        let factory: ModuleFactory = Arc::new(move || factory().map(|m| Arc::new(m) as ModuleHandle));
        self.entries.insert(
            name.into(),
            Implementation::Module {
                capabilities: capabilities.into_iter().map(Into::into).collect(),
                factory,
            },
        );
        self
    }

    /// Register an explicit provider. Catalog entries naming it are pulled
    /// out of the module catalog and into the provider registry.
    pub fn register_provider<P, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        P: PersistentService + 'static,
        F: Fn(&StorageEnv) -> MonitorResult<P> + Send + Sync + 'static,
    {
        let factory: ProviderFactory = Arc::new(move |env: &StorageEnv| {
            factory(env).map(|p| Arc::new(p) as Arc<dyn PersistentService>)
        });
        self.entries
            .insert(name.into(), Implementation::Provider(factory));
        self
    }

    /// Register a storage factory. Schemes map to it through
    /// `steward.protocol.<scheme>` entries.
    pub fn register_storage<P, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        P: PersistentService + 'static,
        F: Fn(&str, &StorageEnv) -> MonitorResult<P> + Send + Sync + 'static,
    {
        let factory: StorageFactory = Arc::new(move |scheme: &str, env: &StorageEnv| {
            factory(scheme, env).map(|p| Arc::new(p) as Arc<dyn PersistentService>)
        });
        self.entries
            .insert(name.into(), Implementation::Storage(factory));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Implementation> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Create an unbooted module by registered name.
    pub fn new_instance(&self, name: &str) -> MonitorResult<ModuleHandle> {
        match self.entries.get(name) {
            Some(Implementation::Module { factory, .. }) => {
                factory().map_err(|e| MonitorError::RegisteredClass {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            }
            Some(other) => Err(MonitorError::RegisteredClass {
                name: name.to_string(),
                reason: format!("registered as a {}, not a module", other.kind()),
            }),
            None => Err(MonitorError::RegisteredClass {
                name: name.to_string(),
                reason: "no such implementation".to_string(),
            }),
        }
    }

    /// Instantiate the provider behind `name` for `scheme`.
    pub(crate) fn new_provider(
        &self,
        name: &str,
        scheme: &str,
        env: &StorageEnv,
    ) -> MonitorResult<Arc<dyn PersistentService>> {
        let failed = |reason: String| MonitorError::StorageInstantiation {
            scheme: scheme.to_string(),
            implementation: name.to_string(),
            reason,
        };
        match self.entries.get(name) {
            Some(Implementation::Storage(factory)) => {
                factory(scheme, env).map_err(|e| failed(e.to_string()))
            }
            Some(Implementation::Provider(factory)) => {
                factory(env).map_err(|e| failed(e.to_string()))
            }
            Some(Implementation::Module { .. }) => {
                Err(failed("registered as a module, not storage".to_string()))
            }
            None => Err(failed("no such implementation".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NoOpLogger;
    use std::path::PathBuf;

    struct Echo;
    impl Module for Echo {}

    fn env() -> StorageEnv {
        StorageEnv {
            system_home: PathBuf::from("/tmp"),
            logger: Arc::new(NoOpLogger),
        }
    }

    #[test]
    fn test_builtins_are_storage() {
        let registry = ImplementationRegistry::with_builtins();
        assert!(matches!(
            registry.get(DIRECTORY_STORAGE),
            Some(Implementation::Storage(_))
        ));
        assert!(matches!(
            registry.get(MEMORY_STORAGE),
            Some(Implementation::Storage(_))
        ));
    }

    #[test]
    fn test_new_instance_creates_fresh_modules() {
        let mut registry = ImplementationRegistry::new();
        registry.register_module("echo", ["Echo"], || Ok(Echo));

        let a = registry.new_instance("echo").unwrap();
        let b = registry.new_instance("echo").unwrap();
        assert!(!crate::module::same_module(&a, &b));
    }

    #[test]
    fn test_new_instance_rejects_non_modules() {
        let registry = ImplementationRegistry::with_builtins();
        let err = registry.new_instance(DIRECTORY_STORAGE).unwrap_err();
        assert!(matches!(err, MonitorError::RegisteredClass { .. }));
        assert!(registry.new_instance("missing").is_err());
    }

    #[test]
    fn test_new_provider_uses_mapped_scheme() {
        let registry = ImplementationRegistry::with_builtins();
        let provider = registry
            .new_provider(MEMORY_STORAGE, "scratch", &env())
            .unwrap();
        assert_eq!(provider.scheme(), "scratch");
    }

    #[test]
    fn test_new_provider_for_module_fails() {
        let mut registry = ImplementationRegistry::new();
        registry.register_module("echo", ["Echo"], || Ok(Echo));
        assert!(matches!(
            registry.new_provider("echo", "x", &env()),
            Err(MonitorError::StorageInstantiation { .. })
        ));
    }

    #[test]
    fn test_module_capabilities_recorded() {
        let mut registry = ImplementationRegistry::new();
        registry.register_module("echo", ["Echo", "Sink"], || Ok(Echo));
        match registry.get("echo") {
            Some(Implementation::Module { capabilities, .. }) => {
                assert_eq!(capabilities.len(), 2);
                assert_eq!(capabilities[1].as_str(), "Sink");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
