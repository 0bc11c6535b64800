//! In-memory provider.
//!
//! Service roots live for the life of the provider instance. Names must
//! carry the scheme prefix (`memory:name`).

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::types::{lead_in, strip_scheme, NameMatch, PersistentService};
use super::MEMORY_SCHEME;
use crate::monitor::{MonitorError, MonitorResult};
use crate::properties::Properties;

/// Provider keeping service roots and descriptors in process memory.
pub struct MemoryService {
    scheme: String,
    /// Canonical name to saved descriptor; `None` until the first save
    roots: Mutex<BTreeMap<String, Option<Properties>>>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::with_scheme(MEMORY_SCHEME)
    }

    pub fn with_scheme(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            roots: Mutex::new(BTreeMap::new()),
        }
    }

    fn canonical_of(&self, name: &str) -> Option<String> {
        let local = strip_scheme(&self.scheme, name)?.trim_end_matches('/');
        if local.is_empty() {
            return None;
        }
        Some(format!("{}{}", lead_in(&self.scheme), local))
    }
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistentService for MemoryService {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn boot_time_services(&self) -> MonitorResult<Vec<String>> {
        Ok(self
            .roots
            .lock()
            .iter()
            .filter(|(_, props)| props.is_some())
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn canonical_service_name(&self, name: &str) -> MonitorResult<NameMatch> {
        let Some(canonical) = self.canonical_of(name) else {
            return Ok(NameMatch::NotMyScheme);
        };
        let exists = matches!(self.roots.lock().get(&canonical), Some(Some(_)));
        Ok(if exists {
            NameMatch::Exists { canonical }
        } else {
            NameMatch::NoSuchService { canonical }
        })
    }

    fn service_properties(
        &self,
        canonical: &str,
        defaults: Option<&Properties>,
    ) -> MonitorResult<Option<Properties>> {
        let roots = self.roots.lock();
        let Some(Some(stored)) = roots.get(canonical) else {
            return Ok(None);
        };
        Ok(Some(match defaults {
            Some(defaults) => {
                let mut layered = Properties::layered(std::sync::Arc::new(defaults.clone()));
                for (k, v) in stored.iter() {
                    layered.set(k, v);
                }
                layered
            }
            None => stored.clone(),
        }))
    }

    fn save_service_properties(
        &self,
        canonical: &str,
        properties: &Properties,
        _replace: bool,
    ) -> MonitorResult<()> {
        let mut roots = self.roots.lock();
        match roots.get_mut(canonical) {
            Some(slot) => {
                *slot = Some(properties.flattened());
                Ok(())
            }
            None => Err(MonitorError::io(
                canonical,
                std::io::Error::new(std::io::ErrorKind::NotFound, "service root does not exist"),
            )),
        }
    }

    fn create_service_root(&self, name: &str, delete_existing: bool) -> MonitorResult<String> {
        let canonical = self
            .canonical_of(name)
            .ok_or_else(|| MonitorError::UnknownProtocol(name.to_string()))?;

        let mut roots = self.roots.lock();
        if roots.contains_key(&canonical) && !delete_existing {
            return Err(MonitorError::ServiceRootExists(PathBuf::from(&canonical)));
        }
        roots.insert(canonical.clone(), None);
        Ok(canonical)
    }

    fn remove_service_root(&self, canonical: &str) -> bool {
        self.roots.lock().remove(canonical).is_some()
    }
}
