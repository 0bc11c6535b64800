//! Service lifecycle states.

use std::fmt;

/// Lifecycle of a running service.
///
/// `Booting -> Active -> ShuttingDown -> Shutdown`, or `Booting -> Shutdown`
/// when the boot fails. A service never returns to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    Booting,
    Active,
    ShuttingDown,
    Shutdown,
}

impl ServiceState {
    /// Whether shutdown has started or finished.
    pub fn is_stopping(self) -> bool {
        matches!(self, ServiceState::ShuttingDown | ServiceState::Shutdown)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceState::Booting => "booting",
            ServiceState::Active => "active",
            ServiceState::ShuttingDown => "shutting down",
            ServiceState::Shutdown => "shutdown",
        };
        f.write_str(label)
    }
}
