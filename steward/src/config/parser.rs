//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::service::ServiceLocale;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [system] section
    if let Some(section) = ini.section(Some("system")) {
        if let Some(v) = section.get("home") {
            let v = v.trim();
            if !v.is_empty() {
                config.system.home = Some(expand_tilde(v));
            }
        }
        if let Some(v) = section.get("platform_version") {
            config.system.platform_version = v.trim().parse().map_err(|_| {
                invalid("system", "platform_version", v, "must be a non-negative integer")
            })?;
        }
        if let Some(v) = section.get("boot_all") {
            config.system.boot_all = parse_bool(v)
                .ok_or_else(|| invalid("system", "boot_all", v, "must be true or false"))?;
        }
    }

    // [boot] section
    if let Some(section) = ini.section(Some("boot")) {
        if let Some(v) = section.get("wait_timeout_secs") {
            let v = v.trim();
            if !v.is_empty() {
                let secs: u64 = v.parse().map_err(|_| {
                    invalid("boot", "wait_timeout_secs", v, "must be a positive integer (seconds)")
                })?;
                if secs == 0 {
                    return Err(invalid(
                        "boot",
                        "wait_timeout_secs",
                        v,
                        "must be greater than zero; leave empty to wait indefinitely",
                    ));
                }
                config.boot.wait_timeout_secs = Some(secs);
            }
        }
        if let Some(v) = section.get("default_locale") {
            let v = v.trim();
            ServiceLocale::parse(v)
                .map_err(|e| invalid("boot", "default_locale", v, &e.to_string()))?;
            config.boot.default_locale = v.to_string();
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Accepts true/false, yes/no, 1/0, on/off in any case.
pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PLATFORM_VERSION;

    fn parse(text: &str) -> Result<ConfigFile, ConfigFileError> {
        parse_ini(&Ini::load_from_str(text).unwrap())
    }

    #[test]
    fn test_empty_ini_gives_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.system.platform_version, DEFAULT_PLATFORM_VERSION);
        assert!(config.boot.wait_timeout_secs.is_none());
    }

    #[test]
    fn test_parse_all_sections() {
        let config = parse(
            "[system]\nhome = /srv/steward\nplatform_version = 11\nboot_all = yes\n\
             [boot]\nwait_timeout_secs = 20\ndefault_locale = de_DE\n\
             [logging]\nfile = /var/log/steward.log\n",
        )
        .unwrap();

        assert_eq!(config.system.home, Some(PathBuf::from("/srv/steward")));
        assert_eq!(config.system.platform_version, 11);
        assert!(config.system.boot_all);
        assert_eq!(config.boot.wait_timeout_secs, Some(20));
        assert_eq!(config.boot.default_locale, "de_DE");
        assert_eq!(config.logging.file, PathBuf::from("/var/log/steward.log"));
    }

    #[test]
    fn test_empty_wait_timeout_means_unbounded() {
        let config = parse("[boot]\nwait_timeout_secs =\n").unwrap();
        assert!(config.boot.wait_timeout_secs.is_none());
    }

    #[test]
    fn test_zero_wait_timeout_rejected() {
        let err = parse("[boot]\nwait_timeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { ref key, .. } if key == "wait_timeout_secs"));
    }

    #[test]
    fn test_invalid_platform_version_rejected() {
        let err = parse("[system]\nplatform_version = new\n").unwrap_err();
        assert!(err.to_string().contains("system.platform_version"));
    }

    #[test]
    fn test_invalid_locale_rejected() {
        assert!(parse("[boot]\ndefault_locale = english\n").is_err());
    }

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
