//! Directory-backed provider.
//!
//! Every service root is a directory holding a `service.properties`
//! descriptor. Relative names resolve against the system home.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::types::{lead_in, strip_scheme, NameMatch, PersistentService, StorageEnv};
use super::DIRECTORY_SCHEME;
use crate::log::Logger;
use crate::monitor::{MonitorError, MonitorResult};
use crate::properties::{read_properties, write_properties, Properties};
use crate::{log_debug, log_warn};

/// Descriptor file kept in each service root.
pub const SERVICE_PROPERTIES_FILE: &str = "service.properties";

const BACKUP_SUFFIX: &str = "bak";

/// Provider whose service roots are directories.
pub struct DirectoryService {
    scheme: String,
    home: PathBuf,
    logger: Arc<dyn Logger>,
}

impl DirectoryService {
    /// Provider for the default `directory` scheme.
    pub fn new(env: &StorageEnv) -> Self {
        Self::with_scheme(DIRECTORY_SCHEME, env)
    }

    /// Provider answering to another scheme. Canonical names carry the
    /// `scheme:` prefix unless the scheme is `directory`.
    pub fn with_scheme(scheme: impl Into<String>, env: &StorageEnv) -> Self {
        Self {
            scheme: scheme.into(),
            home: canonical_path(&env.system_home),
            logger: Arc::clone(&env.logger),
        }
    }

    /// The system home relative names resolve against.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Absolute root directory for a name in this scheme.
    fn root_of(&self, name: &str) -> Option<PathBuf> {
        let local = strip_scheme(&self.scheme, name)?;
        if local.is_empty() {
            return None;
        }
        let path = Path::new(local);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.home.join(path)
        };
        Some(canonical_path(&joined))
    }

    fn canonical_of(&self, root: &Path) -> String {
        format!("{}{}", lead_in(&self.scheme), root.display())
    }

    fn descriptor_of(&self, canonical: &str) -> MonitorResult<PathBuf> {
        self.root_of(canonical)
            .map(|root| root.join(SERVICE_PROPERTIES_FILE))
            .ok_or_else(|| MonitorError::UnknownProtocol(canonical.to_string()))
    }
}

impl PersistentService for DirectoryService {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn boot_time_services(&self) -> MonitorResult<Vec<String>> {
        let entries = match fs::read_dir(&self.home) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MonitorError::io(&self.home, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MonitorError::io(&self.home, e))?;
            let path = entry.path();
            if path.is_dir() && path.join(SERVICE_PROPERTIES_FILE).is_file() {
                names.push(self.canonical_of(&canonical_path(&path)));
            }
        }
        names.sort();
        Ok(names)
    }

    fn canonical_service_name(&self, name: &str) -> MonitorResult<NameMatch> {
        let Some(root) = self.root_of(name) else {
            return Ok(NameMatch::NotMyScheme);
        };
        let canonical = self.canonical_of(&root);
        if root.join(SERVICE_PROPERTIES_FILE).is_file() {
            Ok(NameMatch::Exists { canonical })
        } else {
            Ok(NameMatch::NoSuchService { canonical })
        }
    }

    fn user_service_name(&self, canonical: &str) -> String {
        let local = strip_scheme(&self.scheme, canonical).unwrap_or(canonical);
        let relative = Path::new(local)
            .strip_prefix(&self.home)
            .ok()
            .filter(|rest| !rest.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new(local));
        relative.to_string_lossy().replace('\\', "/")
    }

    fn service_properties(
        &self,
        canonical: &str,
        defaults: Option<&Properties>,
    ) -> MonitorResult<Option<Properties>> {
        let path = self.descriptor_of(canonical)?;
        let Some(stored) = read_properties(&path)? else {
            return Ok(None);
        };

        let Some(defaults) = defaults else {
            return Ok(Some(stored));
        };
        let mut layered = Properties::layered(Arc::new(defaults.clone()));
        for (k, v) in stored.iter() {
            layered.set(k, v);
        }
        Ok(Some(layered))
    }

    fn save_service_properties(
        &self,
        canonical: &str,
        properties: &Properties,
        replace: bool,
    ) -> MonitorResult<()> {
        let path = self.descriptor_of(canonical)?;
        let backup = path.with_extension(format!("properties.{}", BACKUP_SUFFIX));

        let backed_up = replace && path.is_file();
        if backed_up {
            fs::rename(&path, &backup).map_err(|e| MonitorError::io(&path, e))?;
        }

        if let Err(e) = write_properties(properties, &path) {
            if backed_up {
                if let Err(restore) = fs::rename(&backup, &path) {
                    log_warn!(
                        self.logger,
                        "Could not restore {} from backup: {}",
                        path.display(),
                        restore
                    );
                }
            }
            return Err(e.into());
        }

        if backed_up {
            fs::remove_file(&backup).map_err(|e| MonitorError::io(&backup, e))?;
        }
        log_debug!(self.logger, "Saved service descriptor {}", path.display());
        Ok(())
    }

    fn create_service_root(&self, name: &str, delete_existing: bool) -> MonitorResult<String> {
        let root = self
            .root_of(name)
            .ok_or_else(|| MonitorError::UnknownProtocol(name.to_string()))?;

        if root.exists() {
            if !delete_existing {
                return Err(MonitorError::ServiceRootExists(root));
            }
            fs::remove_dir_all(&root).map_err(|e| MonitorError::ServiceRootRemoval {
                name: root.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        fs::create_dir_all(&root).map_err(|e| MonitorError::io(&root, e))?;

        // Re-resolve now that the directory exists so symlinked parents and
        // case differences settle into the final name.
        let created = fs::canonicalize(&root).map_err(|e| {
            let _ = fs::remove_dir_all(&root);
            MonitorError::io(&root, e)
        })?;
        Ok(self.canonical_of(&created))
    }

    fn remove_service_root(&self, canonical: &str) -> bool {
        let Some(root) = self.root_of(canonical) else {
            return false;
        };
        match fs::remove_dir_all(&root) {
            Ok(()) => true,
            Err(e) => {
                log_warn!(
                    self.logger,
                    "Could not remove service root {}: {}",
                    root.display(),
                    e
                );
                false
            }
        }
    }
}

/// Absolute form of `path`: the deepest existing ancestor is resolved
/// through the filesystem and the remaining components are appended
/// lexically.
fn canonical_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let normalized = normalize(&absolute);

    let mut existing = normalized.as_path();
    let mut tail = Vec::new();
    loop {
        if let Ok(resolved) = fs::canonicalize(existing) {
            return tail.iter().rev().fold(resolved, |acc, c| acc.join(c));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

/// Remove `.` and resolve `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
