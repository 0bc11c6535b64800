//! Steward - module and service bootstrap for embeddable engines
//!
//! This library discovers module implementations from layered property
//! sources, boots them on demand inside named services, and tracks every
//! running service until shutdown.
//!
//! # High-Level API
//!
//! Most callers build a [`monitor::ServiceRegistry`] and ask it for
//! services:
//!
//! ```ignore
//! use steward::config::ConfigFile;
//! use steward::monitor::RegistryBuilder;
//!
//! let registry = RegistryBuilder::new(ConfigFile::load()?)
//!     .implementations(implementations)
//!     .build()?;
//!
//! // Create a durable service under the system home
//! registry.create_persistent_service("Logger", "sys", None)?;
//! assert_eq!(registry.get_service_list("Logger"), vec!["sys"]);
//! ```

pub mod capability;
pub mod catalog;
pub mod config;
pub mod context;
pub mod env;
pub mod log;
pub mod logging;
pub mod module;
pub mod monitor;
pub mod properties;
pub mod provider;
pub mod service;

/// Version of the Steward library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
