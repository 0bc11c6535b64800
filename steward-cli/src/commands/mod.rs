//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`catalog`] - Catalog and scheme table summary
//! - [`config`] - Configuration management (get, set, list, path)
//! - [`services`] - Persistent service roots (roots, canonical, remove)

pub mod catalog;
pub mod config;
pub mod services;
