//! Process environment seen by the registry.
//!
//! Three operations touch the environment: resolving the system home,
//! reading property files, and spawning daemon threads. Each consults a
//! [`PermissionCheck`] first, so an embedding application can sandbox the
//! registry without wrapping every call site.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Running engine's feature level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    pub version: u32,
}

impl PlatformInfo {
    pub fn new(version: u32) -> Self {
        Self { version }
    }

    /// True if a catalog entry requiring `level` can run here.
    pub fn supports(&self, level: u32) -> bool {
        level <= self.version
    }
}

/// An environment access the registry is about to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvAccess {
    /// Resolving the system home directory
    SystemHome,
    /// Reading a property file or environment-named source
    ReadProperties(PathBuf),
    /// Spawning a named background thread
    SpawnThread(String),
}

impl fmt::Display for EnvAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvAccess::SystemHome => write!(f, "resolve system home"),
            EnvAccess::ReadProperties(path) => write!(f, "read {}", path.display()),
            EnvAccess::SpawnThread(name) => write!(f, "spawn thread '{}'", name),
        }
    }
}

/// Decides whether an [`EnvAccess`] is allowed.
pub type PermissionCheck = Arc<dyn Fn(&EnvAccess) -> bool + Send + Sync>;

/// Permission check that allows everything.
pub fn allow_all() -> PermissionCheck {
    Arc::new(|_| true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_supports_lower_levels() {
        let platform = PlatformInfo::new(8);
        assert!(platform.supports(0));
        assert!(platform.supports(8));
        assert!(!platform.supports(9));
    }

    #[test]
    fn test_custom_permission_check() {
        let check: PermissionCheck =
            Arc::new(|access| !matches!(access, EnvAccess::SpawnThread(_)));
        assert!(check(&EnvAccess::SystemHome));
        assert!(!check(&EnvAccess::SpawnThread("antiGC".into())));
        assert!(allow_all()(&EnvAccess::SpawnThread("x".into())));
    }
}
