//! Property key vocabulary.
//!
//! Keys understood in catalog sources (`steward.module.*`,
//! `steward.env.*`, `steward.protocol.*`), in persisted service descriptors,
//! and in the runtime-only namespace that is stripped before anything is
//! written to a service root.

/// `steward.module.<tag>=<implementation>` declares a catalog entry.
pub const MODULE_PREFIX: &str = "steward.module.";

/// `steward.env.platform.<tag>=<level>` gates an entry on the platform level.
pub const ENV_PLATFORM_PREFIX: &str = "steward.env.platform.";

/// `steward.env.classes.<tag>=<a,b,c>` gates an entry on other registered
/// implementations being available.
pub const ENV_CLASSES_PREFIX: &str = "steward.env.classes.";

/// `steward.protocol.<scheme>=<storage implementation>` maps a name scheme to
/// a storage factory.
pub const PROTOCOL_PREFIX: &str = "steward.protocol.";

/// `steward.service.<name>=<capability>` names a service started at boot.
/// The value `serviceDirectory` marks a persistent service.
pub const SERVICE_PREFIX: &str = "steward.service.";

/// Value of a `steward.service.<name>` entry denoting a persistent service.
pub const SERVICE_DIRECTORY: &str = "serviceDirectory";

/// Boot every persistent service the providers can enumerate.
pub const BOOT_ALL: &str = "steward.system.bootAll";

/// Set in a service descriptor to keep it out of boot-time startup.
pub const NO_AUTO_BOOT: &str = "steward.database.noAutoBoot";

/// Capability the service was created with.
pub const SERVICE_PROTOCOL: &str = "steward.serviceProtocol";

/// Locale the service was created with.
pub const SERVICE_LOCALE: &str = "steward.serviceLocale";

/// Caller-supplied locale request at create time.
pub const TERRITORY: &str = "territory";

/// Prefix of keys that are never persisted.
pub const RUNTIME_PREFIX: &str = "steward.__rt.";

/// Remove an existing root before creating a service.
pub const DELETE_ON_CREATE: &str = "steward.__rt.deleteOnCreate";

/// Remove the root if booting an existing service fails.
pub const DELETE_ROOT_ON_ERROR: &str = "steward.__rt.deleteRootOnError";

/// Service is being restored; persist descriptor after boot.
pub const IN_RESTORE: &str = "steward.__rt.inRestore";

/// Canonical root of the service, set while booting.
pub const SERVICE_ROOT: &str = "steward.__rt.serviceRoot";

/// Scheme of the provider that owns the service, set while booting.
pub const SERVICE_TYPE: &str = "steward.__rt.serviceType";

/// True for keys that must not reach a persisted descriptor.
pub fn is_runtime_key(key: &str) -> bool {
    key.starts_with(RUNTIME_PREFIX)
}
