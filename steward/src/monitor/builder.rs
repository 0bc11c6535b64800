//! Registry construction.
//!
//! The builder gathers the property sources, assembles the catalogs, and
//! starts the services named at boot:
//!
//! 1. boot properties given to the builder
//! 2. the process-wide file named by `STEWARD_PROPERTIES`
//! 3. `<system home>/steward.properties`
//! 4. the built-in defaults, extra defaults given to the builder, and
//!    `<system home>/modules.d/*.properties` in file-name order
//!
//! Unreadable or denied property files are logged and skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::registry::{RegistryParts, ServiceRegistry};
use super::{MonitorError, MonitorResult};
use crate::catalog::{builtin_defaults, merge_sources, AssemblyEnv, ImplementationRegistry};
use crate::config::property_keys::BOOT_ALL;
use crate::config::{
    ConfigFile, APPLICATION_PROPERTIES_FILE, CATALOG_FILE_EXTENSION, DEFAULT_CATALOG_DIR,
    PROCESS_PROPERTIES_ENV,
};
use crate::env::{allow_all, EnvAccess, PermissionCheck, PlatformInfo};
use crate::log::{Logger, TracingLogger};
use crate::properties::{Properties, PropertySource, SourceKind};
use crate::provider::{ServiceProviderRegistry, StorageEnv};
use crate::service::ServiceLocale;
use crate::{log_debug, log_info, log_warn};

/// Builds a [`ServiceRegistry`].
///
/// # Example
///
/// ```
/// use steward::config::ConfigFile;
/// use steward::monitor::RegistryBuilder;
///
/// let home = tempfile::tempdir().unwrap();
/// let mut config = ConfigFile::default();
/// config.system.home = Some(home.path().to_path_buf());
///
/// let registry = RegistryBuilder::new(config)
///     .skip_process_properties()
///     .build()
///     .unwrap();
/// assert!(registry.get_service_list("Logger").is_empty());
/// ```
pub struct RegistryBuilder {
    config: ConfigFile,
    implementations: ImplementationRegistry,
    logger: Option<Arc<dyn Logger>>,
    boot: Properties,
    process_wide: ProcessSource,
    application: Option<PropertySource>,
    defaults: Vec<PropertySource>,
    permissions: PermissionCheck,
}

enum ProcessSource {
    /// Read the file named by `STEWARD_PROPERTIES`
    FromEnv,
    Given(PropertySource),
    Skip,
}

impl RegistryBuilder {
    /// Builder with the built-in storage factories and no boot properties.
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config,
            implementations: ImplementationRegistry::with_builtins(),
            logger: None,
            boot: Properties::new(),
            process_wide: ProcessSource::FromEnv,
            application: None,
            defaults: Vec::new(),
            permissions: allow_all(),
        }
    }

    /// Replace the implementation registry.
    pub fn implementations(mut self, implementations: ImplementationRegistry) -> Self {
        self.implementations = implementations;
        self
    }

    /// Logger for the registry and everything it creates. Defaults to
    /// [`TracingLogger`].
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Add one boot property.
    pub fn boot_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.boot.set(key, value);
        self
    }

    /// Add boot properties; later values win.
    pub fn boot_properties(mut self, properties: &Properties) -> Self {
        for (key, value) in properties.flattened().iter() {
            self.boot.set(key, value);
        }
        self
    }

    /// Use `source` as the process-wide source instead of reading
    /// `STEWARD_PROPERTIES`.
    pub fn process_properties(mut self, source: PropertySource) -> Self {
        self.process_wide = ProcessSource::Given(source);
        self
    }

    /// Ignore `STEWARD_PROPERTIES`.
    pub fn skip_process_properties(mut self) -> Self {
        self.process_wide = ProcessSource::Skip;
        self
    }

    /// Use `source` as the application source instead of reading
    /// `<system home>/steward.properties`.
    pub fn application_properties(mut self, source: PropertySource) -> Self {
        self.application = Some(source);
        self
    }

    /// Add a default source, merged after the built-in list.
    pub fn default_source(mut self, source: PropertySource) -> Self {
        self.defaults.push(source);
        self
    }

    /// Consulted before the system home is resolved, property files are
    /// read, or daemon threads are spawned.
    pub fn permissions(mut self, permissions: PermissionCheck) -> Self {
        self.permissions = permissions;
        self
    }

    /// Assemble the catalogs, create the registry and start the boot-time
    /// services.
    pub fn build(self) -> MonitorResult<Arc<ServiceRegistry>> {
        let logger = self
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger::new()));

        if !(self.permissions)(&EnvAccess::SystemHome) {
            return Err(MonitorError::PermissionDenied(EnvAccess::SystemHome.to_string()));
        }
        let home = self.config.system.resolved_home();
        ServiceLocale::parse(&self.config.boot.default_locale)?;

        let loader = SourceLoader {
            permissions: &self.permissions,
            logger: &logger,
        };
        let process_wide = match self.process_wide {
            ProcessSource::Given(source) => Some(source),
            ProcessSource::Skip => None,
            ProcessSource::FromEnv => std::env::var_os(PROCESS_PROPERTIES_ENV)
                .and_then(|path| loader.load(SourceKind::ProcessWide, Path::new(&path))),
        };
        let application = match self.application {
            Some(source) => Some(source),
            None => loader.load(SourceKind::Application, &home.join(APPLICATION_PROPERTIES_FILE)),
        };

        let mut defaults = vec![builtin_defaults()];
        defaults.extend(self.defaults);
        for path in catalog_files(&home.join(DEFAULT_CATALOG_DIR), &logger) {
            defaults.extend(loader.load(SourceKind::Default, &path));
        }

        let boot = (!self.boot.is_empty())
            .then(|| PropertySource::new(SourceKind::Boot, "boot", self.boot.clone()));
        let process_props = process_wide
            .as_ref()
            .map(|s| s.properties.clone())
            .unwrap_or_default();
        let application_props = application
            .as_ref()
            .map(|s| s.properties.clone())
            .unwrap_or_default();
        let boot_all = self.config.system.boot_all
            || self.boot.get_bool(BOOT_ALL)
            || process_wide
                .as_ref()
                .is_some_and(|s| s.properties.get_bool(BOOT_ALL));

        let platform = PlatformInfo::new(self.config.system.platform_version);
        let implementations = Arc::new(self.implementations);
        let mut providers = ServiceProviderRegistry::new(
            Arc::clone(&implementations),
            StorageEnv {
                system_home: home.clone(),
                logger: Arc::clone(&logger),
            },
        );
        let catalogs = merge_sources(
            boot,
            process_wide,
            application,
            defaults,
            &AssemblyEnv {
                implementations: &implementations,
                platform,
                logger: &logger,
            },
            &mut providers,
        );

        let registry = Arc::new(ServiceRegistry::from_parts(RegistryParts {
            catalogs,
            providers,
            implementations,
            platform,
            system_home: home,
            application: application_props,
            default_locale: self.config.boot.default_locale.clone(),
            wait_timeout: self.config.boot.wait_timeout(),
            permissions: self.permissions,
            logger: Arc::clone(&logger),
        }));
        log_info!(
            logger,
            "Service registry started (home {}, platform {})",
            registry.system_home().display(),
            platform.version
        );

        registry.start_services(&self.boot, boot_all);
        registry.start_services(&process_props, boot_all);
        registry.start_services(registry.application_properties(), boot_all);
        if boot_all {
            let booted = registry.boot_persistent_services();
            log_info!(logger, "Booted {} persistent service(s)", booted);
        }
        Ok(registry)
    }
}

struct SourceLoader<'a> {
    permissions: &'a PermissionCheck,
    logger: &'a Arc<dyn Logger>,
}

impl SourceLoader<'_> {
    fn load(&self, kind: SourceKind, path: &Path) -> Option<PropertySource> {
        let access = EnvAccess::ReadProperties(path.to_path_buf());
        if !(self.permissions)(&access) {
            log_warn!(self.logger, "Permission denied: {}", access);
            return None;
        }
        match PropertySource::load(kind, path) {
            Ok(Some(source)) => {
                log_debug!(self.logger, "Loaded {} properties from {}", kind, path.display());
                Some(source)
            }
            Ok(None) => None,
            Err(e) => {
                log_warn!(self.logger, "Skipping property source {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// `*.properties` files in `dir`, sorted by name.
fn catalog_files(dir: &Path, logger: &Arc<dyn Logger>) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            log_warn!(logger, "Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == CATALOG_FILE_EXTENSION)
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{CapturingLogger, LogLevel};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn config_for(home: &TempDir) -> ConfigFile {
        let mut config = ConfigFile::default();
        config.system.home = Some(home.path().to_path_buf());
        config
    }

    #[test]
    fn test_catalog_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.properties"), "").unwrap();
        fs::write(dir.path().join("a.properties"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("sub.properties")).unwrap();

        let logger: Arc<dyn Logger> = Arc::new(CapturingLogger::new());
        let names: Vec<_> = catalog_files(dir.path(), &logger)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.properties", "b.properties"]);
        assert!(catalog_files(&dir.path().join("missing"), &logger).is_empty());
    }

    #[test]
    fn test_build_reads_home_sources() {
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join(APPLICATION_PROPERTIES_FILE),
            "steward.protocol.scratch=storage.memory\n",
        )
        .unwrap();
        fs::create_dir(home.path().join(DEFAULT_CATALOG_DIR)).unwrap();
        fs::write(
            home.path().join(DEFAULT_CATALOG_DIR).join("extra.properties"),
            "steward.protocol.directory=storage.memory\n",
        )
        .unwrap();

        let capture = Arc::new(CapturingLogger::new());
        let registry = RegistryBuilder::new(config_for(&home))
            .skip_process_properties()
            .logger(capture.clone())
            .build()
            .unwrap();

        let schemes: Vec<_> = registry
            .providers()
            .schemes()
            .iter()
            .map(|(s, i)| format!("{}={}", s, i))
            .collect();
        assert!(schemes.contains(&"scratch=storage.memory".to_string()));
        assert!(
            schemes.contains(&"directory=storage.directory".to_string()),
            "built-in default wins over modules.d"
        );
        assert!(capture.contains(LogLevel::Info, "Ignored duplicate property steward.protocol.directory"));
    }

    #[test]
    fn test_denied_reads_are_skipped() {
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join(APPLICATION_PROPERTIES_FILE),
            "steward.protocol.scratch=storage.memory\n",
        )
        .unwrap();

        let capture = Arc::new(CapturingLogger::new());
        let registry = RegistryBuilder::new(config_for(&home))
            .skip_process_properties()
            .logger(capture.clone())
            .permissions(Arc::new(|access: &EnvAccess| {
                !matches!(access, EnvAccess::ReadProperties(_))
            }))
            .build()
            .unwrap();

        assert!(registry.providers().schemes().iter().all(|(s, _)| s != "scratch"));
        assert!(capture.contains(LogLevel::Warn, "Permission denied"));
    }

    #[test]
    fn test_denied_home_fails_build() {
        let home = TempDir::new().unwrap();
        let result = RegistryBuilder::new(config_for(&home))
            .skip_process_properties()
            .permissions(Arc::new(|access: &EnvAccess| *access != EnvAccess::SystemHome))
            .build();
        assert!(matches!(result, Err(MonitorError::PermissionDenied(_))));
    }

    #[test]
    fn test_invalid_default_locale_fails_build() {
        let home = TempDir::new().unwrap();
        let mut config = config_for(&home);
        config.boot.default_locale = "english".to_string();
        let result = RegistryBuilder::new(config).skip_process_properties().build();
        assert!(matches!(result, Err(MonitorError::InvalidLocale(_))));
    }
}
