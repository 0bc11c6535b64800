//! Configuration for the service registry.
//!
//! Two kinds of configuration live here:
//!
//! - the operator file `~/.steward/steward.ini` ([`ConfigFile`]), which
//!   controls where the system home is, the platform feature level used to
//!   gate catalog entries, boot behaviour and logging;
//! - the property key vocabulary ([`property_keys`]) understood by catalog
//!   sources, service descriptors and runtime-only boot attributes.
//!
//! # Example
//!
//! ```
//! use steward::config::{ConfigFile, ConfigKey};
//!
//! let mut config = ConfigFile::default();
//! let key: ConfigKey = "boot.wait_timeout_secs".parse().unwrap();
//! key.set(&mut config, "30").unwrap();
//! assert_eq!(config.boot.wait_timeout_secs, Some(30));
//! ```

mod defaults;
mod file;
mod keys;
mod parser;
pub mod property_keys;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use keys::{ConfigKey, ConfigKeyError};
pub use settings::{BootSettings, ConfigFile, LoggingSettings, SystemSettings};
