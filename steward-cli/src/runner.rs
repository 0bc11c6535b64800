//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and registry
//! construction so command handlers only deal with their own output.

use crate::error::CliError;
use std::path::PathBuf;
use std::sync::Arc;
use steward::config::ConfigFile;
use steward::log::TracingLogger;
use steward::logging::{init_logging_full, LoggingGuard};
use steward::monitor::{RegistryBuilder, ServiceRegistry};
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file, with command-line overrides applied
    config: ConfigFile,
}

impl CliRunner {
    /// Create a runner, loading config and initializing logging.
    ///
    /// Logs go to the configured log file only; stdout carries command
    /// output.
    ///
    /// # Arguments
    ///
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    /// * `home` - System home overriding `system.home`
    pub fn with_options(debug_mode: bool, home: Option<PathBuf>) -> Result<Self, CliError> {
        let mut config = ConfigFile::load()?;
        if let Some(home) = home {
            config.system.home = Some(home);
        }

        let log_path = &config.logging.file;
        let log_dir = log_path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| steward::logging::default_log_file().to_string());

        let logging_guard = init_logging_full(&log_dir, &log_file, false, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("Steward v{}", steward::VERSION);
        info!("Steward CLI: {} command", command);
        info!("System home: {}", self.config.system.resolved_home().display());
    }

    /// Build a registry over the configured system home with the built-in
    /// storage factories.
    pub fn create_registry(&self) -> Result<Arc<ServiceRegistry>, CliError> {
        RegistryBuilder::new(self.config.clone())
            .logger(Arc::new(TracingLogger::new()))
            .build()
            .map_err(CliError::RegistryStartup)
            .inspect(|_| info!("Service registry started"))
    }
}
