//! Ordered catalogs and capability resolution.

use std::fmt;
use std::sync::Arc;

use super::descriptor::ImplementationDescriptor;
use crate::capability::CapabilityId;
use crate::log::Logger;
use crate::module::ModuleHandle;
use crate::properties::{Properties, SourceKind};
use crate::{log_debug, log_warn};

/// Descriptors from one property source, in resolution order.
#[derive(Debug, Clone)]
pub struct ImplementationCatalog {
    kind: SourceKind,
    origin: String,
    descriptors: Vec<ImplementationDescriptor>,
}

impl ImplementationCatalog {
    /// Build a catalog, ordering descriptors by rank (highest first) and
    /// then by the order they were given in.
    pub fn new(
        kind: SourceKind,
        origin: impl Into<String>,
        mut descriptors: Vec<ImplementationDescriptor>,
    ) -> Self {
        descriptors.sort_by_key(|d| std::cmp::Reverse(d.rank()));
        Self {
            kind,
            origin: origin.into(),
            descriptors,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn descriptors(&self) -> &[ImplementationDescriptor] {
        &self.descriptors
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Instantiate the first descriptor serving `capability` whose instance
    /// accepts `properties`.
    ///
    /// A factory failure is logged and the candidate skipped.
    pub fn resolve(
        &self,
        capability: &CapabilityId,
        properties: Option<&Properties>,
        logger: &Arc<dyn Logger>,
    ) -> Option<(&ImplementationDescriptor, ModuleHandle)> {
        for descriptor in self.descriptors.iter().filter(|d| d.provides(capability)) {
            let instance = match descriptor.instantiate() {
                Ok(instance) => instance,
                Err(e) => {
                    log_warn!(
                        logger,
                        "Could not instantiate {} for {}: {}",
                        descriptor.implementation,
                        capability,
                        e
                    );
                    continue;
                }
            };
            if instance.can_support(properties) {
                return Some((descriptor, instance));
            }
            log_debug!(
                logger,
                "{} declined to support {}",
                descriptor.implementation,
                capability
            );
        }
        None
    }
}

/// A catalog entry that was left out during assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedEntry {
    pub source: SourceKind,
    pub origin: String,
    pub tag: String,
    pub implementation: String,
    pub reason: String,
}

impl fmt::Display for ExcludedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} = {} ({})",
            self.source, self.tag, self.implementation, self.reason
        )
    }
}

/// Catalogs in precedence order: boot, process-wide, application, defaults.
#[derive(Debug, Clone, Default)]
pub struct CatalogSet {
    catalogs: Vec<ImplementationCatalog>,
    excluded: Vec<ExcludedEntry>,
}

impl CatalogSet {
    /// Collect catalogs; they are sorted into precedence order.
    pub fn new(mut catalogs: Vec<ImplementationCatalog>, excluded: Vec<ExcludedEntry>) -> Self {
        catalogs.sort_by_key(|c| c.kind);
        Self { catalogs, excluded }
    }

    pub fn catalogs(&self) -> &[ImplementationCatalog] {
        &self.catalogs
    }

    /// Entries that were filtered out during assembly.
    pub fn excluded(&self) -> &[ExcludedEntry] {
        &self.excluded
    }

    /// Resolve `capability`, consulting `local` before the assembled
    /// catalogs.
    pub fn resolve(
        &self,
        capability: &CapabilityId,
        properties: Option<&Properties>,
        local: Option<&ImplementationCatalog>,
        logger: &Arc<dyn Logger>,
    ) -> Option<(ImplementationDescriptor, ModuleHandle)> {
        local
            .into_iter()
            .chain(self.catalogs.iter())
            .find_map(|catalog| catalog.resolve(capability, properties, logger))
            .map(|(descriptor, instance)| (descriptor.clone(), instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::descriptor::Requirements;
    use crate::catalog::ModuleFactory;
    use crate::log::{CapturingLogger, LogLevel, NoOpLogger};
    use crate::module::{Module, ModuleError};

    struct Named(&'static str);
    impl Module for Named {}

    struct Refuses;
    impl Module for Refuses {
        fn can_support(&self, _properties: Option<&Properties>) -> bool {
            false
        }
    }

    fn descriptor(tag: &str, rank: Option<u32>, factory: ModuleFactory) -> ImplementationDescriptor {
        ImplementationDescriptor::new(
            tag,
            format!("impl.{}", tag),
            vec![CapabilityId::new("Logger")],
            Requirements {
                min_platform_version: rank,
                required_implementations: Vec::new(),
            },
            SourceKind::Default,
            factory,
        )
    }

    fn named(name: &'static str) -> ModuleFactory {
        Arc::new(move || Ok(Arc::new(Named(name)) as ModuleHandle))
    }

    fn tag_of(handle: &ModuleHandle) -> &'static str {
        crate::module::downcast::<Named>(handle).map(|n| n.0).unwrap_or("?")
    }

    #[test]
    fn test_higher_rank_resolves_first() {
        let catalog = ImplementationCatalog::new(
            SourceKind::Default,
            "builtin",
            vec![
                descriptor("generic", None, named("generic")),
                descriptor("v4", Some(4), named("v4")),
                descriptor("v6", Some(6), named("v6")),
                descriptor("v4b", Some(4), named("v4b")),
            ],
        );
        let order: Vec<&str> = catalog.descriptors().iter().map(|d| d.tag.as_str()).collect();
        assert_eq!(order, vec!["v6", "v4", "v4b", "generic"]);

        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
        let (found, handle) = catalog
            .resolve(&CapabilityId::new("Logger"), None, &logger)
            .unwrap();
        assert_eq!(found.tag, "v6");
        assert_eq!(tag_of(&handle), "v6");
    }

    #[test]
    fn test_failed_factory_and_refusal_are_skipped() {
        let failing: ModuleFactory = Arc::new(|| Err(ModuleError::service("no device")));
        let refusing: ModuleFactory = Arc::new(|| Ok(Arc::new(Refuses) as ModuleHandle));
        let catalog = ImplementationCatalog::new(
            SourceKind::Default,
            "builtin",
            vec![
                descriptor("broken", None, failing),
                descriptor("picky", None, refusing),
                descriptor("fallback", None, named("fallback")),
            ],
        );

        let capture = Arc::new(CapturingLogger::new());
        let logger: Arc<dyn Logger> = capture.clone();
        let (found, _) = catalog
            .resolve(&CapabilityId::new("Logger"), None, &logger)
            .unwrap();
        assert_eq!(found.tag, "fallback");
        assert!(capture.contains(LogLevel::Warn, "impl.broken"));
    }

    #[test]
    fn test_unmatched_capability_resolves_nothing() {
        let catalog = ImplementationCatalog::new(
            SourceKind::Default,
            "builtin",
            vec![descriptor("a", None, named("a"))],
        );
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
        assert!(catalog
            .resolve(&CapabilityId::new("Cache"), None, &logger)
            .is_none());
    }

    #[test]
    fn test_set_follows_precedence_and_local_first() {
        let application = ImplementationCatalog::new(
            SourceKind::Application,
            "app",
            vec![descriptor("app", None, named("app"))],
        );
        let defaults = ImplementationCatalog::new(
            SourceKind::Default,
            "defaults",
            vec![descriptor("default", Some(9), named("default"))],
        );
        let set = CatalogSet::new(vec![defaults, application], Vec::new());
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
        let cap = CapabilityId::new("Logger");

        let (found, _) = set.resolve(&cap, None, None, &logger).unwrap();
        assert_eq!(found.tag, "app");

        let local = ImplementationCatalog::new(
            SourceKind::Boot,
            "local",
            vec![descriptor("local", None, named("local"))],
        );
        let (found, _) = set.resolve(&cap, None, Some(&local), &logger).unwrap();
        assert_eq!(found.tag, "local");
    }
}
