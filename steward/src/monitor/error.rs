//! Registry error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::capability::{CapabilityId, CapabilityKey};
use crate::module::{ModuleError, Severity};
use crate::properties::PropertiesError;

/// Errors raised by the service registry.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No catalog entry could satisfy the capability
    #[error("No implementation available for capability '{0}'")]
    NoImplementation(CapabilityId),

    /// No provider understands the name's scheme
    #[error("Unknown protocol for service name '{0}'")]
    UnknownProtocol(String),

    /// More than one provider claims the service name
    #[error("Ambiguous service name '{0}': more than one provider claims it")]
    AmbiguousProtocol(String),

    /// Duplicate service key at create time
    #[error("Service {0} already exists")]
    ServiceAlreadyExists(CapabilityKey),

    /// Registry or service is shutting down
    #[error("Service registry is shutting down")]
    ShuttingDown,

    /// A required descriptor property is absent
    #[error("Required property '{0}' is missing")]
    PropertyMissing(String),

    /// The storage factory behind a scheme could not be instantiated
    #[error("Cannot instantiate storage factory '{implementation}' for scheme '{scheme}': {reason}")]
    StorageInstantiation {
        scheme: String,
        implementation: String,
        reason: String,
    },

    /// A registered implementation could not be created by name
    #[error("Cannot create registered implementation '{name}': {reason}")]
    RegisteredClass { name: String, reason: String },

    /// Module boot failed
    #[error("Failed to boot '{implementation}': {source}")]
    BootFailed {
        implementation: String,
        #[source]
        source: ModuleError,
    },

    /// Locale description is malformed
    #[error("Invalid locale '{0}': expected xx, xx_YY or xx_YY_variant")]
    InvalidLocale(String),

    /// Service root already exists and deletion was not requested
    #[error("Service root {} already exists", .0.display())]
    ServiceRootExists(PathBuf),

    /// Service root could not be removed
    #[error("Cannot remove service root '{name}': {reason}")]
    ServiceRootRemoval { name: String, reason: String },

    /// The module passed as owner does not belong to any running service
    #[error("Module does not belong to a running service")]
    UnknownOwner,

    /// Gave up waiting on another thread's boot
    #[error("Timed out waiting for {0} to finish booting")]
    BootTimeout(CapabilityKey),

    /// The permission check refused an environment access
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A daemon thread could not be started
    #[error("Cannot spawn daemon thread '{name}': {source}")]
    DaemonSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Property file access failed
    #[error(transparent)]
    Properties(#[from] PropertiesError),

    /// Filesystem failure in a provider
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MonitorError {
    /// How far the failure reaches; drives service shutdown on boot errors.
    pub fn severity(&self) -> Severity {
        match self {
            MonitorError::BootFailed { source, .. } => source.severity(),
            MonitorError::StorageInstantiation { .. }
            | MonitorError::Properties(_)
            | MonitorError::Io { .. } => Severity::Service,
            MonitorError::ShuttingDown => Severity::System,
            _ => Severity::Session,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MonitorError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the registry.
pub type MonitorResult<T> = Result<T, MonitorError>;
