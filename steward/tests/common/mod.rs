//! Shared fixtures for the registry integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use steward::catalog::ImplementationRegistry;
use steward::config::ConfigFile;
use steward::log::{CapturingLogger, Logger};
use steward::module::{Module, ModuleError, Severity};
use steward::monitor::{BootContext, RegistryBuilder, ServiceRegistry};
use steward::properties::Properties;

/// Records what the test modules do.
#[derive(Default)]
pub struct Probe {
    constructed: AtomicUsize,
    fail_next: Mutex<Option<Severity>>,
    events: Mutex<Vec<String>>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// Make the next boot fail with `severity`.
    pub fn fail_next(&self, severity: Severity) {
        *self.fail_next.lock() = Some(severity);
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Events starting with `prefix`.
    pub fn events_with(&self, prefix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }
}

/// A logger-like module that reports its lifecycle to a [`Probe`].
pub struct ProbeModule {
    label: &'static str,
    serial: usize,
    probe: Arc<Probe>,
    boot_delay: Duration,
    service: Mutex<String>,
}

impl ProbeModule {
    pub fn new(label: &'static str, probe: &Arc<Probe>, boot_delay: Duration) -> Self {
        let serial = probe.constructed.fetch_add(1, Ordering::SeqCst) + 1;
        Self {
            label,
            serial,
            probe: Arc::clone(probe),
            boot_delay,
            service: Mutex::new(String::new()),
        }
    }

    pub fn label(&self) -> &str {
        self.label
    }

    pub fn serial(&self) -> usize {
        self.serial
    }
}

impl Module for ProbeModule {
    fn boot(&self, ctx: &BootContext<'_>, _create: bool, _properties: &Properties) -> Result<(), ModuleError> {
        if !self.boot_delay.is_zero() {
            thread::sleep(self.boot_delay);
        }
        if let Some(severity) = self.probe.fail_next.lock().take() {
            return Err(ModuleError::new(severity, format!("{} refused to boot", self.label)));
        }
        let service = ctx.service_name().unwrap_or_else(|| "pool".to_string());
        self.probe.record(format!("boot {} #{} in {}", self.label, self.serial, service));
        *self.service.lock() = service;
        Ok(())
    }

    fn stop(&self) {
        self.probe
            .record(format!("stop {} #{} in {}", self.label, self.serial, self.service.lock()));
    }
}

/// Module that boots its own capability again from inside `boot`, once.
pub struct Reentrant {
    inner: ProbeModule,
    recursed: Arc<AtomicBool>,
}

impl Reentrant {
    pub fn new(probe: &Arc<Probe>, recursed: &Arc<AtomicBool>) -> Self {
        Self {
            inner: ProbeModule::new("echo", probe, Duration::ZERO),
            recursed: Arc::clone(recursed),
        }
    }

    pub fn serial(&self) -> usize {
        self.inner.serial
    }
}

impl Module for Reentrant {
    fn boot(&self, ctx: &BootContext<'_>, create: bool, properties: &Properties) -> Result<(), ModuleError> {
        if !self.recursed.swap(true, Ordering::SeqCst) {
            ctx.start_module(create, "Echo", None, None)?;
        }
        self.inner.boot(ctx, create, properties)
    }

    fn stop(&self) {
        self.inner.stop();
    }
}

/// Implementations used across the tests, all reporting to `probe`.
///
/// - `test.logger` serves `Logger`
/// - `test.logger.slow` serves `Logger`, sleeping during boot
/// - `test.audit` serves `Audit`
pub fn implementations(probe: &Arc<Probe>) -> ImplementationRegistry {
    let mut implementations = ImplementationRegistry::with_builtins();
    let p = Arc::clone(probe);
    implementations.register_module("test.logger", ["Logger"], move || {
        Ok(ProbeModule::new("logger", &p, Duration::ZERO))
    });
    let p = Arc::clone(probe);
    implementations.register_module("test.logger.slow", ["Logger"], move || {
        Ok(ProbeModule::new("slow", &p, Duration::from_millis(100)))
    });
    let p = Arc::clone(probe);
    implementations.register_module("test.audit", ["Audit"], move || {
        Ok(ProbeModule::new("audit", &p, Duration::ZERO))
    });
    implementations
}

pub fn config_for(home: &Path) -> ConfigFile {
    let mut config = ConfigFile::default();
    config.system.home = Some(home.to_path_buf());
    config
}

/// Registry over `home` with `boot` as boot properties.
pub fn registry(
    home: &Path,
    implementations: ImplementationRegistry,
    boot: &[(&str, &str)],
) -> (Arc<ServiceRegistry>, Arc<CapturingLogger>) {
    let logger = Arc::new(CapturingLogger::new());
    let mut builder = RegistryBuilder::new(config_for(home))
        .skip_process_properties()
        .implementations(implementations)
        .logger(Arc::clone(&logger) as Arc<dyn Logger>);
    for (key, value) in boot {
        builder = builder.boot_property(*key, *value);
    }
    let registry = builder.build().expect("registry should build");
    (registry, logger)
}
