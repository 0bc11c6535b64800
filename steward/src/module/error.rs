//! Errors raised by module boot.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// How far the damage of a failure reaches.
///
/// Ordered: a failure of [`Severity::Service`] or above takes down the
/// service the failing module was booted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Statement,
    Transaction,
    Session,
    Service,
    System,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Warning => "warning",
            Severity::Statement => "statement",
            Severity::Transaction => "transaction",
            Severity::Session => "session",
            Severity::Service => "service",
            Severity::System => "system",
        };
        f.write_str(label)
    }
}

/// Failure reported by [`Module::boot`](super::Module::boot).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ModuleError {
    message: String,
    severity: Severity,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl ModuleError {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            source: None,
        }
    }

    /// Failure that should shut down the owning service.
    pub fn service(message: impl Into<String>) -> Self {
        Self::new(Severity::Service, message)
    }

    /// Failure confined to the module being booted.
    pub fn session(message: impl Into<String>) -> Self {
        Self::new(Severity::Session, message)
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<crate::monitor::MonitorError> for ModuleError {
    fn from(err: crate::monitor::MonitorError) -> Self {
        Self::new(err.severity(), err.to_string()).with_source(err)
    }
}

impl From<std::io::Error> for ModuleError {
    fn from(err: std::io::Error) -> Self {
        Self::new(Severity::Service, err.to_string()).with_source(err)
    }
}
