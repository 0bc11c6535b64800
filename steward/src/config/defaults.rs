//! Default values for all configuration settings.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;

/// Engine feature level assumed when `system.platform_version` is unset.
pub const DEFAULT_PLATFORM_VERSION: u32 = 8;

/// Do not boot every discovered persistent service unless asked to.
pub const DEFAULT_BOOT_ALL: bool = false;

/// Locale recorded for newly created services.
pub const DEFAULT_LOCALE: &str = "en_US";

/// Name of the main configuration file.
pub const CONFIG_FILE_NAME: &str = "steward.ini";

/// Application-level property source, relative to the system home.
pub const APPLICATION_PROPERTIES_FILE: &str = "steward.properties";

/// Directory of extra default catalog files, relative to the system home.
pub const DEFAULT_CATALOG_DIR: &str = "modules.d";

/// Extension of default catalog files.
pub const CATALOG_FILE_EXTENSION: &str = "properties";

/// Environment variable naming the process-wide property source.
pub const PROCESS_PROPERTIES_ENV: &str = "STEWARD_PROPERTIES";

/// Default log file location (`~/.steward/logs/steward.log`).
pub fn default_log_path() -> PathBuf {
    config_directory()
        .join("logs")
        .join(crate::logging::default_log_file())
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            system: SystemSettings::default(),
            boot: BootSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            home: None,
            platform_version: DEFAULT_PLATFORM_VERSION,
            boot_all: DEFAULT_BOOT_ALL,
        }
    }
}

impl Default for BootSettings {
    fn default() -> Self {
        Self {
            wait_timeout_secs: None,
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: default_log_path(),
        }
    }
}
