//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use steward::config::ConfigFileError;
use steward::monitor::MonitorError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to build the service registry
    RegistryStartup(MonitorError),
    /// A registry operation failed
    Registry(MonitorError),
}

impl CliError {
    /// Process exit code: 2 for configuration problems, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::RegistryStartup(MonitorError::PermissionDenied(_)) => {
                eprintln!();
                eprintln!("The system home could not be accessed. Check that:");
                eprintln!("  1. system.home points to a readable directory");
                eprintln!("  2. Your user owns the directory or has read access");
            }
            CliError::Registry(MonitorError::UnknownProtocol(_)) => {
                eprintln!();
                eprintln!("No provider answers to that name. Known schemes are listed by:");
                eprintln!("  steward catalog");
            }
            CliError::Registry(MonitorError::ServiceRootRemoval { .. }) => {
                eprintln!();
                eprintln!("Make sure no running process still has the service open.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::RegistryStartup(e) => write!(f, "Failed to start service registry: {}", e),
            CliError::Registry(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::RegistryStartup(e) => Some(e),
            CliError::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<MonitorError> for CliError {
    fn from(e: MonitorError) -> Self {
        CliError::Registry(e)
    }
}
