//! Scheme-to-provider resolution.

use dashmap::DashMap;
use std::sync::Arc;

use super::types::{scheme_of, PersistentService, StorageEnv, DIRECTORY_SCHEME};
use crate::catalog::ImplementationRegistry;
use crate::config::property_keys::PROTOCOL_PREFIX;
use crate::monitor::{MonitorError, MonitorResult};
use crate::properties::Properties;
use crate::{log_debug, log_warn};

/// Registry of persistent-service providers.
///
/// Providers come from two places:
///
/// - explicit providers pulled out of the catalogs at assembly time
/// - the scheme table (`steward.protocol.<scheme>=<storage implementation>`),
///   whose providers are created on first use and cached per scheme
///
/// The registry is filled while the catalogs are assembled and is read-only
/// afterwards; only the instance cache changes.
pub struct ServiceProviderRegistry {
    explicit: Vec<Arc<dyn PersistentService>>,
    /// Scheme to storage implementation name, first registration wins
    schemes: Vec<(String, String)>,
    instantiated: DashMap<String, Arc<dyn PersistentService>>,
    implementations: Arc<ImplementationRegistry>,
    env: StorageEnv,
}

impl ServiceProviderRegistry {
    pub fn new(implementations: Arc<ImplementationRegistry>, env: StorageEnv) -> Self {
        Self {
            explicit: Vec::new(),
            schemes: Vec::new(),
            instantiated: DashMap::new(),
            implementations,
            env,
        }
    }

    /// Add an explicit provider.
    pub fn add_explicit(&mut self, provider: Arc<dyn PersistentService>) {
        log_debug!(
            self.env.logger,
            "Registered explicit provider for scheme '{}'",
            provider.scheme()
        );
        self.explicit.push(provider);
    }

    /// Map `scheme` to a storage implementation. Returns false if the scheme
    /// was already mapped; the earlier mapping stays.
    pub fn add_scheme(&mut self, scheme: impl Into<String>, implementation: impl Into<String>) -> bool {
        let scheme = scheme.into();
        if self.schemes.iter().any(|(s, _)| *s == scheme) {
            return false;
        }
        self.schemes.push((scheme, implementation.into()));
        true
    }

    /// Drop explicit providers that cannot run in this environment.
    pub fn determine_supported(&mut self) {
        let logger = Arc::clone(&self.env.logger);
        self.explicit.retain(|provider| {
            let supported = provider.can_support(None);
            if !supported {
                log_debug!(
                    logger,
                    "Provider for scheme '{}' is not supported here",
                    provider.scheme()
                );
            }
            supported
        });
    }

    /// Explicit providers in registration order.
    pub fn explicit(&self) -> &[Arc<dyn PersistentService>] {
        &self.explicit
    }

    /// The scheme table in registration order.
    pub fn schemes(&self) -> &[(String, String)] {
        &self.schemes
    }

    pub fn env(&self) -> &StorageEnv {
        &self.env
    }

    /// The provider for `scheme`: an explicit provider if one answers to it,
    /// otherwise the scheme table's provider.
    pub fn provider(&self, scheme: &str) -> MonitorResult<Option<Arc<dyn PersistentService>>> {
        if let Some(provider) = self.explicit.iter().find(|p| p.scheme() == scheme) {
            return Ok(Some(Arc::clone(provider)));
        }
        self.table_provider(scheme)
    }

    fn table_provider(&self, scheme: &str) -> MonitorResult<Option<Arc<dyn PersistentService>>> {
        if let Some(cached) = self.instantiated.get(scheme) {
            return Ok(Some(Arc::clone(cached.value())));
        }
        let Some((_, implementation)) = self.schemes.iter().find(|(s, _)| s == scheme) else {
            return Ok(None);
        };

        let created = self
            .implementations
            .new_provider(implementation, scheme, &self.env)?;
        let winner = self.instantiated.entry(scheme.to_string()).or_insert(created);
        Ok(Some(Arc::clone(winner.value())))
    }

    /// Every provider registered under `scheme`, explicit ones first.
    pub(crate) fn providers_for_scheme(&self, scheme: &str) -> MonitorResult<Vec<Arc<dyn PersistentService>>> {
        let mut found: Vec<Arc<dyn PersistentService>> = self
            .explicit
            .iter()
            .filter(|p| p.scheme() == scheme)
            .cloned()
            .collect();
        if let Some(table) = self.table_provider(scheme)? {
            push_distinct(&mut found, table);
        }
        Ok(found)
    }

    /// The provider that should create a service called `name`.
    ///
    /// Only the scheme prefix is considered: a bare name or a drive-letter
    /// path goes to the directory scheme, a leading colon to nobody.
    pub fn find_provider_for_create(
        &self,
        name: &str,
    ) -> MonitorResult<Option<Arc<dyn PersistentService>>> {
        match scheme_of(name) {
            None => self.provider(DIRECTORY_SCHEME),
            Some("") => Ok(None),
            Some(scheme) => self.provider(scheme),
        }
    }

    /// Find the provider holding an existing service called `name`, with
    /// the service's canonical name.
    ///
    /// With an explicit scheme every provider registered under it is asked
    /// and more than one claim is an error. A bare name, or a scheme nobody
    /// answers to, is offered to every provider in [`enumerate`] order and
    /// the first claim wins.
    ///
    /// [`enumerate`]: Self::enumerate
    pub fn resolve_scheme(
        &self,
        name: &str,
    ) -> MonitorResult<Option<(Arc<dyn PersistentService>, String)>> {
        if let Some(scheme) = scheme_of(name) {
            if scheme.is_empty() {
                return Ok(None);
            }
            let candidates = self.providers_for_scheme(scheme)?;
            if !candidates.is_empty() {
                let mut claims = Vec::new();
                for provider in candidates {
                    if let Some(canonical) = Self::canonicalize(provider.as_ref(), name)? {
                        claims.push((provider, canonical));
                    }
                }
                if claims.len() > 1 {
                    return Err(MonitorError::AmbiguousProtocol(name.to_string()));
                }
                return Ok(claims.pop());
            }
        }

        for provider in self.enumerate(None) {
            if let Some(canonical) = Self::canonicalize(provider.as_ref(), name)? {
                return Ok(Some((provider, canonical)));
            }
        }
        Ok(None)
    }

    /// Canonical name of an existing service, or `None` if `provider` does
    /// not hold one under `name`.
    pub fn canonicalize(
        provider: &dyn PersistentService,
        name: &str,
    ) -> MonitorResult<Option<String>> {
        Ok(provider.canonical_service_name(name)?.existing())
    }

    /// All providers in search order: explicit ones, then the scheme table
    /// except directory, then protocols named in `start_params`, then
    /// directory.
    ///
    /// Providers that fail to instantiate are logged and skipped.
    pub fn enumerate(&self, start_params: Option<&Properties>) -> Vec<Arc<dyn PersistentService>> {
        let mut providers: Vec<Arc<dyn PersistentService>> = self.explicit.clone();

        for (scheme, _) in &self.schemes {
            if scheme == DIRECTORY_SCHEME {
                continue;
            }
            match self.table_provider(scheme) {
                Ok(Some(provider)) => push_distinct(&mut providers, provider),
                Ok(None) => {}
                Err(e) => log_warn!(self.env.logger, "Skipping scheme '{}': {}", scheme, e),
            }
        }

        if let Some(params) = start_params {
            for (scheme, implementation) in params.with_prefix(PROTOCOL_PREFIX) {
                if providers.iter().any(|p| p.scheme() == scheme) {
                    continue;
                }
                match self
                    .implementations
                    .new_provider(implementation, scheme, &self.env)
                {
                    Ok(provider) => providers.push(provider),
                    Err(e) => log_warn!(self.env.logger, "Skipping scheme '{}': {}", scheme, e),
                }
            }
        }

        match self.table_provider(DIRECTORY_SCHEME) {
            Ok(Some(provider)) => push_distinct(&mut providers, provider),
            Ok(None) => {}
            Err(e) => log_warn!(
                self.env.logger,
                "Skipping scheme '{}': {}",
                DIRECTORY_SCHEME,
                e
            ),
        }
        providers
    }
}

fn push_distinct(list: &mut Vec<Arc<dyn PersistentService>>, provider: Arc<dyn PersistentService>) {
    if !list.iter().any(|p| Arc::ptr_eq(p, &provider)) {
        list.push(provider);
    }
}
