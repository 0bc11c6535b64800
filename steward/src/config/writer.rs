//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let home = config
        .system
        .home
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();
    let wait_timeout = config
        .boot
        .wait_timeout_secs
        .map(|s| s.to_string())
        .unwrap_or_default();

    format!(
        r#"[system]
; System home directory. Relative service names, the application property
; file (steward.properties) and extra catalog files (modules.d/*.properties)
; are resolved against it. Empty means the current working directory.
home = {}
; Feature level of the running engine. Catalog entries declaring a higher
; steward.env.platform.<tag> level are excluded at boot.
platform_version = {}
; Boot every persistent service the registered providers can enumerate.
boot_all = {}

[boot]
; Seconds to wait for another thread's in-progress boot of the same service
; or module. Empty waits indefinitely.
wait_timeout_secs = {}
; Locale recorded for services created without an explicit territory
; (format: xx, xx_YY or xx_YY_variant).
default_locale = {}

[logging]
; Log file path (truncated at the start of every session)
file = {}
"#,
        home,
        config.system.platform_version,
        config.system.boot_all,
        wait_timeout,
        config.boot.default_locale,
        path_to_string(&config.logging.file),
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
