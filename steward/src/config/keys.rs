//! Configuration key access and validation.
//!
//! Type-safe get/set of `steward.ini` values by `section.key` name, with
//! validation expressed as value specifications.

use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use super::parser::{expand_tilde, parse_bool};
use super::settings::ConfigFile;
use crate::service::ServiceLocale;

/// Errors that can occur when getting or setting configuration values.
#[derive(Debug, Error)]
pub enum ConfigKeyError {
    /// Unknown configuration key.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Validation failed for the value.
    #[error("Invalid value for {key}: {reason}")]
    ValidationFailed { key: String, reason: String },
}

/// Supported configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    SystemHome,
    SystemPlatformVersion,
    SystemBootAll,
    BootWaitTimeoutSecs,
    BootDefaultLocale,
    LoggingFile,
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|k| k.name() == s.to_lowercase())
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl ConfigKey {
    /// Canonical key name (e.g., "boot.wait_timeout_secs").
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::SystemHome => "system.home",
            ConfigKey::SystemPlatformVersion => "system.platform_version",
            ConfigKey::SystemBootAll => "system.boot_all",
            ConfigKey::BootWaitTimeoutSecs => "boot.wait_timeout_secs",
            ConfigKey::BootDefaultLocale => "boot.default_locale",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// Section name (e.g., "boot").
    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or("")
    }

    /// Key name within the section (e.g., "wait_timeout_secs").
    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or(self.name())
    }

    /// Current value rendered as a string; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::SystemHome => config
                .system
                .home
                .as_ref()
                .map(|p| path_to_display(p))
                .unwrap_or_default(),
            ConfigKey::SystemPlatformVersion => config.system.platform_version.to_string(),
            ConfigKey::SystemBootAll => config.system.boot_all.to_string(),
            ConfigKey::BootWaitTimeoutSecs => config
                .boot
                .wait_timeout_secs
                .map(|s| s.to_string())
                .unwrap_or_default(),
            ConfigKey::BootDefaultLocale => config.boot.default_locale.clone(),
            ConfigKey::LoggingFile => path_to_display(&config.logging.file),
        }
    }

    /// Validate and set the value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        self.validate(value)?;
        let value = value.trim();
        match self {
            ConfigKey::SystemHome => {
                config.system.home = (!value.is_empty()).then(|| expand_tilde(value));
            }
            ConfigKey::SystemPlatformVersion => {
                config.system.platform_version = self.parsed(value)?;
            }
            ConfigKey::SystemBootAll => {
                config.system.boot_all = parse_bool(value).unwrap_or(false);
            }
            ConfigKey::BootWaitTimeoutSecs => {
                config.boot.wait_timeout_secs = if value.is_empty() {
                    None
                } else {
                    Some(self.parsed(value)?)
                };
            }
            ConfigKey::BootDefaultLocale => {
                config.boot.default_locale = value.to_string();
            }
            ConfigKey::LoggingFile => {
                config.logging.file = expand_tilde(value);
            }
        }
        Ok(())
    }

    /// Validate a value according to this key's specification.
    pub fn validate(&self, value: &str) -> Result<(), ConfigKeyError> {
        self.specification()
            .is_satisfied_by(value.trim())
            .map_err(|reason| ConfigKeyError::ValidationFailed {
                key: self.name().to_string(),
                reason,
            })
    }

    fn parsed<T: FromStr>(&self, value: &str) -> Result<T, ConfigKeyError> {
        value.parse().map_err(|_| ConfigKeyError::ValidationFailed {
            key: self.name().to_string(),
            reason: "value out of range".to_string(),
        })
    }

    fn specification(&self) -> Box<dyn ValueSpecification> {
        match self {
            ConfigKey::SystemHome => Box::new(OptionalPathSpec),
            ConfigKey::SystemPlatformVersion => Box::new(IntegerSpec { allow_zero: true }),
            ConfigKey::SystemBootAll => Box::new(BooleanSpec),
            ConfigKey::BootWaitTimeoutSecs => Box::new(OptionalSpec(IntegerSpec {
                allow_zero: false,
            })),
            ConfigKey::BootDefaultLocale => Box::new(LocaleSpec),
            ConfigKey::LoggingFile => Box::new(PathSpec),
        }
    }

    /// All supported configuration keys, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::SystemHome,
            ConfigKey::SystemPlatformVersion,
            ConfigKey::SystemBootAll,
            ConfigKey::BootWaitTimeoutSecs,
            ConfigKey::BootDefaultLocale,
            ConfigKey::LoggingFile,
        ]
    }
}

// ============================================================================
// Value Specifications
// ============================================================================

trait ValueSpecification {
    /// Returns Err(reason) if the value is not acceptable.
    fn is_satisfied_by(&self, value: &str) -> Result<(), String>;
}

struct IntegerSpec {
    allow_zero: bool,
}

impl ValueSpecification for IntegerSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        match value.parse::<u64>() {
            Ok(0) if !self.allow_zero => Err("must be greater than zero".to_string()),
            Ok(_) => Ok(()),
            Err(_) => Err("must be a positive integer".to_string()),
        }
    }
}

/// Empty is accepted; anything else must satisfy the inner spec.
struct OptionalSpec<S>(S);

impl<S: ValueSpecification> ValueSpecification for OptionalSpec<S> {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            Ok(())
        } else {
            self.0.is_satisfied_by(value)
        }
    }
}

struct BooleanSpec;

impl ValueSpecification for BooleanSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        parse_bool(value)
            .map(|_| ())
            .ok_or_else(|| "must be true/false, yes/no, 1/0, or on/off".to_string())
    }
}

struct LocaleSpec;

impl ValueSpecification for LocaleSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        ServiceLocale::parse(value)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

struct PathSpec;

impl ValueSpecification for PathSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            Err("must be a valid path".to_string())
        } else {
            Ok(())
        }
    }
}

struct OptionalPathSpec;

impl ValueSpecification for OptionalPathSpec {
    fn is_satisfied_by(&self, _value: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Convert path to display string, collapsing home dir to ~.
fn path_to_display(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
