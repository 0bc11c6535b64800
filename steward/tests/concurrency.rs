//! Integration tests for concurrent boot.
//!
//! - Concurrent boots of one key construct exactly one module
//! - Concurrent boots of one named service share its top module
//! - A re-entrant boot that publishes first wins; the loser is stopped
//! - A configured wait timeout bounds waiting on another thread's boot

mod common;

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use common::{config_for, implementations, registry, Probe, ProbeModule, Reentrant};
use steward::log::NoOpLogger;
use steward::module::{downcast, same_module, ModuleHandle};
use steward::monitor::{MonitorError, RegistryBuilder, ServiceRegistry};
use tempfile::TempDir;

const THREADS: usize = 8;

#[test]
fn test_concurrent_pool_boot_constructs_once() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let (registry, _) = registry(
        home.path(),
        implementations(&probe),
        &[("steward.module.slow", "test.logger.slow")],
    );

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.start_system_module("Logger").unwrap()
            })
        })
        .collect();

    let modules: Vec<ModuleHandle> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(probe.constructed(), 1);
    assert!(modules.iter().all(|m| same_module(m, &modules[0])));
    assert_eq!(probe.events_with("boot").len(), 1);
}

#[test]
fn test_concurrent_named_service_boot_shares_top_module() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let (registry, _) = registry(
        home.path(),
        implementations(&probe),
        &[("steward.module.slow", "test.logger.slow")],
    );

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry
                    .start_non_persistent_service("Logger", "shared", None)
                    .unwrap()
            })
        })
        .collect();

    let modules: Vec<ModuleHandle> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(probe.constructed(), 1);
    assert!(modules.iter().all(|m| same_module(m, &modules[0])));
    assert_eq!(registry.get_service_list("Logger"), vec!["shared".to_string()]);
}

#[test]
fn test_concurrent_persistent_create_has_one_winner() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let (registry, _) = registry(
        home.path(),
        implementations(&probe),
        &[("steward.module.slow", "test.logger.slow")],
    );

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry
                    .create_persistent_service("Logger", "race", None)
                    .unwrap()
                    .is_started()
            })
        })
        .collect();

    let started = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|started| *started)
        .count();
    assert_eq!(started, 1);
    assert_eq!(probe.constructed(), 1);
    assert!(registry.find_service("Logger", "race").is_some());
}

#[test]
fn test_reentrant_boot_first_publisher_wins() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let recursed = Arc::new(AtomicBool::new(false));

    let mut implementations = implementations(&probe);
    let p = Arc::clone(&probe);
    let flag = Arc::clone(&recursed);
    implementations.register_module("test.echo", ["Echo"], move || Ok(Reentrant::new(&p, &flag)));

    let (registry, _) = registry(
        home.path(),
        implementations,
        &[("steward.module.echo", "test.echo")],
    );

    let winner = registry.start_system_module("Echo").unwrap();
    assert_eq!(probe.constructed(), 2);
    assert_eq!(downcast::<Reentrant>(&winner).unwrap().serial(), 2);
    assert_eq!(probe.events_with("stop"), vec!["stop echo #1 in pool"]);

    let published = registry.find_system_module("Echo").unwrap();
    assert!(same_module(&winner, &published));
    assert_eq!(registry.pool().instance_count(), 1, "loser discarded");
}

/// Registry whose `Logger` takes 2.5s to boot and whose waiters give up
/// after one second.
fn glacial_registry(home: &Path, probe: &Arc<Probe>) -> Arc<ServiceRegistry> {
    let mut implementations = implementations(probe);
    let p = Arc::clone(probe);
    implementations.register_module("test.logger.glacial", ["Logger"], move || {
        Ok(ProbeModule::new("glacial", &p, Duration::from_millis(2500)))
    });

    let mut config = config_for(home);
    config.boot.wait_timeout_secs = Some(1);
    RegistryBuilder::new(config)
        .skip_process_properties()
        .implementations(implementations)
        .logger(Arc::new(NoOpLogger))
        .boot_property("steward.module.glacial", "test.logger.glacial")
        .build()
        .unwrap()
}

#[test]
fn test_waiting_on_slow_boot_times_out() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let registry = glacial_registry(home.path(), &probe);

    let booter = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.start_system_module("Logger"))
    };
    thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    let err = registry.start_system_module("Logger").unwrap_err();
    let waited = started.elapsed();
    assert!(matches!(err, MonitorError::BootTimeout(_)), "got {:?}", err);
    assert!(waited >= Duration::from_millis(900), "gave up after {:?}", waited);
    assert!(waited < Duration::from_millis(2300), "waited out the boot: {:?}", waited);

    let booted = booter.join().unwrap().unwrap();
    assert_eq!(probe.constructed(), 1, "the waiter never built its own");
    assert!(same_module(&booted, &registry.find_system_module("Logger").unwrap()));
}

#[test]
fn test_find_service_gives_up_on_slow_boot() {
    let home = TempDir::new().unwrap();
    let probe = Probe::new();
    let registry = glacial_registry(home.path(), &probe);

    let booter = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.start_non_persistent_service("Logger", "slow", None))
    };
    thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    assert!(registry.find_service("Logger", "slow").is_none());
    assert!(started.elapsed() < Duration::from_millis(2300));

    let top = booter.join().unwrap().unwrap();
    let found = registry.find_service("Logger", "slow").unwrap();
    assert!(same_module(&top, &found));
}
