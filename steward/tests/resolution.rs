//! Integration tests for implementation and provider resolution.
//!
//! - Source precedence: application entries override defaults
//! - Platform rank ordering and gating within a source
//! - Properties-local catalog entries
//! - Scheme ambiguity between providers

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{config_for, implementations, registry, Probe, ProbeModule};
use steward::catalog::ImplementationRegistry;
use steward::config::property_keys::SERVICE_PROTOCOL;
use steward::log::{CapturingLogger, LogLevel, Logger};
use steward::module::{downcast, Module};
use steward::monitor::{MonitorError, MonitorResult, RegistryBuilder, ServiceRegistry};
use steward::properties::{Properties, PropertySource, SourceKind};
use steward::provider::{NameMatch, PersistentService};
use tempfile::TempDir;

fn label_of(handle: &steward::module::ModuleHandle) -> String {
    downcast::<ProbeModule>(handle).unwrap().label().to_string()
}

/// Implementations with three `Logger` variants.
fn loggers(probe: &Arc<Probe>) -> ImplementationRegistry {
    let mut implementations = implementations(probe);
    let p = Arc::clone(probe);
    implementations.register_module("test.logger.fancy", ["Logger"], move || {
        Ok(ProbeModule::new("fancy", &p, Duration::ZERO))
    });
    implementations.register_module("test.logger.picky", ["Logger"], || Ok(Picky));
    implementations
}

/// Refuses every request that does not ask for it by property.
struct Picky;

impl Module for Picky {
    fn can_support(&self, properties: Option<&Properties>) -> bool {
        properties.is_some_and(|p| p.get_bool("logger.picky"))
    }
}

#[test]
fn test_application_overrides_defaults() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();

    let registry = RegistryBuilder::new(config_for(home.path()))
        .skip_process_properties()
        .implementations(loggers(&probe))
        .logger(Arc::new(CapturingLogger::new()))
        .application_properties(
            PropertySource::parse(
                SourceKind::Application,
                "app",
                "steward.module.fancy=test.logger.fancy\n",
            )
            .unwrap(),
        )
        .default_source(
            PropertySource::parse(
                SourceKind::Default,
                "extra",
                "steward.module.plain=test.logger\n",
            )
            .unwrap(),
        )
        .build()
        .unwrap();

    let logger = registry.start_system_module("Logger").unwrap();
    assert_eq!(label_of(&logger), "fancy");
}

#[test]
fn test_platform_rank_orders_and_gates_entries() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let (registry, logger) = registry(
        home.path(),
        loggers(&probe),
        &[
            ("steward.module.plain", "test.logger"),
            ("steward.module.fancy", "test.logger.fancy"),
            ("steward.env.platform.fancy", "4"),
            ("steward.module.future", "test.logger.slow"),
            ("steward.env.platform.future", "99"),
            ("steward.module.ghost", "test.logger.missing"),
        ],
    );

    let handle = registry.start_system_module("Logger").unwrap();
    assert_eq!(label_of(&handle), "fancy", "ranked entry first");

    let excluded: Vec<_> = registry
        .catalogs()
        .excluded()
        .iter()
        .map(|e| e.tag.clone())
        .collect();
    assert_eq!(excluded, vec!["future".to_string(), "ghost".to_string()]);
    assert!(logger.contains(LogLevel::Warn, "test.logger.missing"));

    let summary = registry.catalog_summary();
    assert!(summary.contains("fancy = test.logger.fancy (Logger) rank 4"));
    assert!(summary.contains("excluded:"));
}

#[test]
fn test_unsupported_candidates_are_skipped() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let (registry, _) = registry(
        home.path(),
        loggers(&probe),
        &[
            ("steward.module.picky", "test.logger.picky"),
            ("steward.env.platform.picky", "8"),
            ("steward.module.plain", "test.logger"),
        ],
    );

    let plain = registry
        .start_module(false, None, "Logger", Some("a"), None)
        .unwrap();
    assert!(downcast::<ProbeModule>(&plain).is_some());

    let props = Properties::from_iter([("logger.picky", "true")]);
    let picky = registry
        .start_module(false, None, "Logger", Some("b"), Some(&props))
        .unwrap();
    assert!(downcast::<Picky>(&picky).is_some());
}

#[test]
fn test_properties_local_catalog_wins() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let (registry, _) = registry(
        home.path(),
        loggers(&probe),
        &[("steward.module.fancy", "test.logger.fancy")],
    );

    let props = Properties::from_iter([("steward.module.local", "test.logger")]);
    let handle = registry
        .start_module(false, None, "Logger", Some("local"), Some(&props))
        .unwrap();
    assert_eq!(label_of(&handle), "logger");

    let default = registry
        .start_module(false, None, "Logger", Some("default"), None)
        .unwrap();
    assert_eq!(label_of(&default), "fancy");
}

// =============================================================================
// Provider ambiguity
// =============================================================================

/// Provider that claims every name in its scheme, and bare names too.
struct Claiming {
    scheme: &'static str,
    owner: &'static str,
}

impl PersistentService for Claiming {
    fn scheme(&self) -> &str {
        self.scheme
    }

    fn canonical_service_name(&self, name: &str) -> MonitorResult<NameMatch> {
        let local = name
            .strip_prefix(self.scheme)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(name);
        Ok(NameMatch::Exists {
            canonical: format!("{}:{}", self.scheme, local),
        })
    }

    fn service_properties(
        &self,
        _canonical: &str,
        _defaults: Option<&Properties>,
    ) -> MonitorResult<Option<Properties>> {
        Ok(Some(Properties::from_iter([
            (SERVICE_PROTOCOL, "Logger"),
            ("owner", self.owner),
        ])))
    }

    fn save_service_properties(
        &self,
        _canonical: &str,
        _properties: &Properties,
        _replace: bool,
    ) -> MonitorResult<()> {
        Ok(())
    }

    fn create_service_root(&self, name: &str, _delete_existing: bool) -> MonitorResult<String> {
        Ok(name.to_string())
    }

    fn remove_service_root(&self, _canonical: &str) -> bool {
        true
    }
}

fn claiming_registry(home: &TempDir, probe: &Arc<Probe>) -> Arc<ServiceRegistry> {
    let mut implementations = implementations(probe);
    implementations
        .register_provider("test.claim.first", |_env| {
            Ok(Claiming {
                scheme: "foo",
                owner: "first",
            })
        })
        .register_provider("test.claim.second", |_env| {
            Ok(Claiming {
                scheme: "foo",
                owner: "second",
            })
        });

    let (registry, _) = registry(
        home.path(),
        implementations,
        &[
            ("steward.module.claima", "test.claim.first"),
            ("steward.module.claimb", "test.claim.second"),
            ("steward.module.logger", "test.logger"),
        ],
    );
    registry
}

#[test]
fn test_explicit_scheme_claimed_twice_is_ambiguous() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let registry = claiming_registry(&home, &probe);

    assert_eq!(registry.providers().explicit().len(), 2);
    assert!(matches!(
        registry.providers().resolve_scheme("foo:mydb"),
        Err(MonitorError::AmbiguousProtocol(_))
    ));
    assert!(matches!(
        registry.start_persistent_service("foo:mydb", None),
        Err(MonitorError::AmbiguousProtocol(_))
    ));
    assert!(registry.get_service_list("Logger").is_empty());
}

#[test]
fn test_bare_name_resolves_to_first_provider() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let registry = claiming_registry(&home, &probe);

    let (provider, canonical) = registry
        .providers()
        .resolve_scheme("mydb")
        .unwrap()
        .unwrap();
    assert_eq!(canonical, "foo:mydb");
    let descriptor = provider.service_properties(&canonical, None).unwrap().unwrap();
    assert_eq!(descriptor.get("owner"), Some("first"));

    // Booting needs a single owner
    assert!(matches!(
        registry.start_persistent_service("mydb", None),
        Err(MonitorError::AmbiguousProtocol(_))
    ));
}

#[test]
fn test_local_catalog_ignores_provider_entries() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let registry = claiming_registry(&home, &probe);

    let logger: Arc<dyn Logger> = Arc::new(CapturingLogger::new());
    let props = Properties::from_iter([("steward.module.extra", "test.claim.first")]);
    let env = steward::catalog::AssemblyEnv {
        implementations: registry.implementations(),
        platform: registry.platform(),
        logger: &logger,
    };
    assert!(steward::catalog::local_catalog(&props, &env).is_none());
}
