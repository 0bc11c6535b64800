//! The service registry.
//!
//! [`ServiceRegistry`] owns the assembled catalogs, the provider registry and
//! every running service. It is built once by [`RegistryBuilder`] and shared
//! as an `Arc`; dropping the last handle shuts it down.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use steward::catalog::ImplementationRegistry;
//! use steward::config::ConfigFile;
//! use steward::log::NoOpLogger;
//! use steward::module::Module;
//! use steward::monitor::RegistryBuilder;
//!
//! struct Clock;
//! impl Module for Clock {}
//!
//! let mut implementations = ImplementationRegistry::with_builtins();
//! implementations.register_module("demo.clock", ["Clock"], || Ok(Clock));
//!
//! let mut config = ConfigFile::default();
//! config.system.home = Some(std::env::temp_dir());
//!
//! let registry = RegistryBuilder::new(config)
//!     .implementations(implementations)
//!     .logger(Arc::new(NoOpLogger))
//!     .boot_property("steward.module.clock", "demo.clock")
//!     .build()
//!     .unwrap();
//!
//! let clock = registry.start_system_module("Clock").unwrap();
//! assert!(registry.find_system_module("Clock").is_ok());
//! # drop(clock);
//! registry.shutdown();
//! ```

mod boot_context;
mod builder;
mod daemon;
mod error;
mod registry;

pub use boot_context::BootContext;
pub use builder::RegistryBuilder;
pub use daemon::{DaemonHandle, DaemonSignal};
pub use error::{MonitorError, MonitorResult};
pub use registry::{BootOutcome, ServiceRegistry};
