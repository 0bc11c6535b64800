//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of `steward.ini`.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete registry configuration loaded from `steward.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// System-wide settings
    pub system: SystemSettings,
    /// Service boot behaviour
    pub boot: BootSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// `[system]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSettings {
    /// System home; relative service names resolve against it.
    /// `None` means the process working directory.
    pub home: Option<PathBuf>,
    /// Feature level of the running engine. Catalog entries requiring a
    /// higher level are excluded.
    pub platform_version: u32,
    /// Boot every persistent service the providers can enumerate.
    pub boot_all: bool,
}

/// `[boot]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct BootSettings {
    /// Upper bound on waiting for another thread's in-progress boot.
    /// `None` waits indefinitely.
    pub wait_timeout_secs: Option<u64>,
    /// Locale recorded for services created without an explicit territory.
    pub default_locale: String,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

impl SystemSettings {
    /// Resolved system home directory.
    pub fn resolved_home(&self) -> PathBuf {
        match &self.home {
            Some(home) => home.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Resolve a relative path against the system home.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.resolved_home().join(path)
        }
    }
}

impl BootSettings {
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_secs.map(Duration::from_secs)
    }
}
