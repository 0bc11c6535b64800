//! Provider trait and supporting types.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::log::Logger;
use crate::monitor::MonitorResult;
use crate::properties::Properties;

/// Scheme of the default directory provider.
pub const DIRECTORY_SCHEME: &str = "directory";

/// Scheme of the in-memory provider.
pub const MEMORY_SCHEME: &str = "memory";

/// Outcome of asking a provider to canonicalize a service name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// The name is not in this provider's syntax
    NotMyScheme,
    /// The name is understood but no service lives there yet
    NoSuchService { canonical: String },
    /// A service exists under this canonical name
    Exists { canonical: String },
}

impl NameMatch {
    /// Canonical name whether or not the service exists.
    pub fn canonical(&self) -> Option<&str> {
        match self {
            NameMatch::NotMyScheme => None,
            NameMatch::NoSuchService { canonical } | NameMatch::Exists { canonical } => {
                Some(canonical)
            }
        }
    }

    /// Canonical name only if the service exists.
    pub fn existing(self) -> Option<String> {
        match self {
            NameMatch::Exists { canonical } => Some(canonical),
            _ => None,
        }
    }
}

/// What a provider gets to work with when it is instantiated.
#[derive(Clone)]
pub struct StorageEnv {
    /// Relative service names resolve against this directory
    pub system_home: PathBuf,
    pub logger: Arc<dyn Logger>,
}

impl fmt::Debug for StorageEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageEnv")
            .field("system_home", &self.system_home)
            .finish_non_exhaustive()
    }
}

/// A naming and persistence scheme for durable services.
pub trait PersistentService: Send + Sync {
    /// Scheme prefix this provider answers to.
    fn scheme(&self) -> &str;

    /// Whether this provider can operate in the current environment.
    fn can_support(&self, _properties: Option<&Properties>) -> bool {
        true
    }

    /// Canonical names of services to boot when the registry starts with
    /// boot-all enabled.
    fn boot_time_services(&self) -> MonitorResult<Vec<String>> {
        Ok(Vec::new())
    }

    /// Canonicalize a user-supplied service name.
    fn canonical_service_name(&self, name: &str) -> MonitorResult<NameMatch>;

    /// Name to show users for a canonical name.
    fn user_service_name(&self, canonical: &str) -> String {
        canonical.to_string()
    }

    /// Whether two canonical names denote the same service.
    fn is_same_service(&self, a: &str, b: &str) -> bool {
        a == b
    }

    /// Load the persisted descriptor, layered over `defaults`.
    /// `None` if the service has no descriptor.
    fn service_properties(
        &self,
        canonical: &str,
        defaults: Option<&Properties>,
    ) -> MonitorResult<Option<Properties>>;

    /// Persist a descriptor. With `replace`, an existing descriptor is kept
    /// as a backup until the new one is written.
    fn save_service_properties(
        &self,
        canonical: &str,
        properties: &Properties,
        replace: bool,
    ) -> MonitorResult<()>;

    /// Materialize the durable root and return its canonical name.
    fn create_service_root(&self, name: &str, delete_existing: bool) -> MonitorResult<String>;

    /// Remove the durable root. Returns false if it could not be removed.
    fn remove_service_root(&self, canonical: &str) -> bool;
}

impl fmt::Debug for dyn PersistentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PersistentService({})", self.scheme())
    }
}

/// Scheme prefix of `name`, if it has one of at least two characters.
///
/// A colon at position 1 is a drive letter and yields the directory scheme;
/// a colon at position 0 yields `Some("")`, which no provider answers to.
pub(crate) fn scheme_of(name: &str) -> Option<&str> {
    match name.find(':') {
        None => None,
        Some(0) => Some(""),
        Some(1) => Some(DIRECTORY_SCHEME),
        Some(pos) => Some(&name[..pos]),
    }
}

/// The part of `name` a provider with `scheme` should resolve, or `None` if
/// the name belongs to another scheme.
///
/// The directory scheme also accepts bare names and drive-letter paths.
pub(crate) fn strip_scheme<'a>(scheme: &str, name: &'a str) -> Option<&'a str> {
    match name.find(':') {
        Some(pos) if pos >= 2 => {
            let (prefix, rest) = name.split_at(pos);
            (prefix == scheme).then(|| &rest[1..])
        }
        _ if scheme == DIRECTORY_SCHEME => Some(name),
        _ => None,
    }
}

/// Prefix prepended to canonical names of a scheme. Empty for the directory
/// scheme.
pub(crate) fn lead_in(scheme: &str) -> String {
    if scheme == DIRECTORY_SCHEME {
        String::new()
    } else {
        format!("{}:", scheme)
    }
}
