//! Catalog assembly from property sources.
//!
//! Each source is scanned in file order:
//!
//! - `steward.protocol.<scheme>=<impl>` maps a scheme to a storage factory
//! - `steward.module.<tag>=<impl>` declares an implementation, gated by
//!   `steward.env.platform.<tag>` and `steward.env.classes.<tag>`
//!
//! Module implementations become descriptors. Provider implementations are
//! instantiated and handed to the provider registry; storage implementations
//! are mapped under their tag. Nothing found here is ever escalated: bad
//! entries are logged and recorded as excluded.

use std::sync::Arc;

use super::descriptor::{ImplementationDescriptor, Requirements};
use super::implementations::{Implementation, ImplementationRegistry, DIRECTORY_STORAGE, MEMORY_STORAGE};
use super::set::{CatalogSet, ExcludedEntry, ImplementationCatalog};
use crate::config::property_keys::{
    ENV_CLASSES_PREFIX, ENV_PLATFORM_PREFIX, MODULE_PREFIX, PROTOCOL_PREFIX,
};
use crate::env::PlatformInfo;
use crate::log::Logger;
use crate::properties::{Properties, PropertySource, SourceKind};
use crate::provider::{ServiceProviderRegistry, DIRECTORY_SCHEME, MEMORY_SCHEME};
use crate::{log_debug, log_info, log_warn};

/// Origin label of the embedded default list.
pub const BUILTIN_ORIGIN: &str = "builtin";

/// What assembly checks entries against.
pub struct AssemblyEnv<'a> {
    pub implementations: &'a ImplementationRegistry,
    pub platform: PlatformInfo,
    pub logger: &'a Arc<dyn Logger>,
}

/// The embedded default catalog.
pub fn builtin_defaults() -> PropertySource {
    let properties = Properties::from_iter([
        (format!("{}{}", PROTOCOL_PREFIX, DIRECTORY_SCHEME), DIRECTORY_STORAGE),
        (format!("{}{}", PROTOCOL_PREFIX, MEMORY_SCHEME), MEMORY_STORAGE),
    ]);
    PropertySource::new(SourceKind::Default, BUILTIN_ORIGIN, properties)
}

/// Merge default sources into one, first file wins.
///
/// A key repeated in a later file is logged and ignored.
pub fn merge_defaults(defaults: Vec<PropertySource>, logger: &Arc<dyn Logger>) -> PropertySource {
    let mut merged = Properties::new();
    let mut origins = Vec::with_capacity(defaults.len());

    for source in defaults {
        for (key, value) in source.properties.iter() {
            if merged.get_local(key).is_some() {
                log_info!(
                    logger,
                    "Ignored duplicate property {} in {}",
                    key,
                    source.origin
                );
                continue;
            }
            merged.set(key, value);
        }
        origins.push(source.origin);
    }

    PropertySource::new(SourceKind::Default, origins.join(", "), merged)
}

/// Assemble the catalog set and fill the provider registry.
///
/// `boot`, `process_wide` and `application` are optional override sources;
/// `defaults` are merged first-file-wins before being scanned. Sources are
/// scanned in precedence order so the first scheme mapping seen wins.
pub fn merge_sources(
    boot: Option<PropertySource>,
    process_wide: Option<PropertySource>,
    application: Option<PropertySource>,
    defaults: Vec<PropertySource>,
    env: &AssemblyEnv<'_>,
    providers: &mut ServiceProviderRegistry,
) -> CatalogSet {
    let defaults = merge_defaults(defaults, env.logger);

    let mut catalogs = Vec::new();
    let mut excluded = Vec::new();
    for source in [boot, process_wide, application, Some(defaults)]
        .into_iter()
        .flatten()
    {
        let catalog = assemble(&source, env, Some(&mut *providers), &mut excluded);
        log_debug!(
            env.logger,
            "Catalog [{}] {}: {} implementation(s)",
            source.kind,
            source.origin,
            catalog.descriptors().len()
        );
        catalogs.push(catalog);
    }

    providers.determine_supported();
    CatalogSet::new(catalogs, excluded)
}

/// One-off catalog from the properties passed to a single resolve call.
///
/// Only module entries are honoured; `None` if there are none.
pub fn local_catalog(properties: &Properties, env: &AssemblyEnv<'_>) -> Option<ImplementationCatalog> {
    let flat = properties.flattened();
    if flat.with_prefix(MODULE_PREFIX).next().is_none() {
        return None;
    }
    let source = PropertySource::new(SourceKind::Boot, "local", flat);
    let mut excluded = Vec::new();
    let catalog = assemble(&source, env, None, &mut excluded);
    (!catalog.is_empty()).then_some(catalog)
}

fn assemble(
    source: &PropertySource,
    env: &AssemblyEnv<'_>,
    mut providers: Option<&mut ServiceProviderRegistry>,
    excluded: &mut Vec<ExcludedEntry>,
) -> ImplementationCatalog {
    let props = &source.properties;
    let mut descriptors = Vec::new();

    let mut exclude = |tag: &str, implementation: &str, reason: String| {
        excluded.push(ExcludedEntry {
            source: source.kind,
            origin: source.origin.clone(),
            tag: tag.to_string(),
            implementation: implementation.to_string(),
            reason,
        });
    };

    for (key, implementation) in props.iter() {
        if let Some(scheme) = key.strip_prefix(PROTOCOL_PREFIX) {
            match providers.as_deref_mut() {
                Some(registry) => {
                    if !registry.add_scheme(scheme, implementation) {
                        log_debug!(
                            env.logger,
                            "Scheme '{}' already mapped, ignoring {} from {}",
                            scheme,
                            implementation,
                            source.origin
                        );
                    }
                }
                None => log_debug!(
                    env.logger,
                    "Ignoring scheme mapping '{}' outside startup sources",
                    scheme
                ),
            }
            continue;
        }

        let Some(tag) = key.strip_prefix(MODULE_PREFIX) else {
            continue;
        };

        let requirements = match requirements_for(props, tag) {
            Ok(requirements) => requirements,
            Err(reason) => {
                log_warn!(env.logger, "Module {} ignored: {}", tag, reason);
                exclude(tag, implementation, reason);
                continue;
            }
        };

        if let Some(level) = requirements.min_platform_version {
            if !env.platform.supports(level) {
                let reason = format!("needs platform version {}", level);
                log_debug!(env.logger, "Module {} ignored: {}", tag, reason);
                exclude(tag, implementation, reason);
                continue;
            }
        }

        if let Some(missing) = requirements
            .required_implementations
            .iter()
            .find(|name| !env.implementations.contains(name))
        {
            let reason = format!("requires unregistered implementation {}", missing);
            log_debug!(env.logger, "Module {} ignored: {}", tag, reason);
            exclude(tag, implementation, reason);
            continue;
        }

        match env.implementations.get(implementation) {
            None => {
                let reason = "unknown implementation".to_string();
                log_warn!(
                    env.logger,
                    "Module {} ignored: {} {}",
                    tag,
                    reason,
                    implementation
                );
                exclude(tag, implementation, reason);
            }
            Some(Implementation::Module {
                capabilities,
                factory,
            }) => descriptors.push(ImplementationDescriptor::new(
                tag,
                implementation,
                capabilities.clone(),
                requirements,
                source.kind,
                Arc::clone(factory),
            )),
            Some(Implementation::Provider(factory)) => match providers.as_deref_mut() {
                Some(registry) => match factory(registry.env()) {
                    Ok(provider) => registry.add_explicit(provider),
                    Err(e) => {
                        log_warn!(env.logger, "Provider {} ignored: {}", implementation, e);
                        exclude(tag, implementation, e.to_string());
                    }
                },
                None => exclude(
                    tag,
                    implementation,
                    "providers are only read from startup sources".to_string(),
                ),
            },
            Some(Implementation::Storage(_)) => match providers.as_deref_mut() {
                Some(registry) => {
                    registry.add_scheme(tag, implementation);
                }
                None => exclude(
                    tag,
                    implementation,
                    "storage is only read from startup sources".to_string(),
                ),
            },
        }
    }

    ImplementationCatalog::new(source.kind, source.origin.clone(), descriptors)
}

fn requirements_for(props: &Properties, tag: &str) -> Result<Requirements, String> {
    let min_platform_version = match props.get(&format!("{}{}", ENV_PLATFORM_PREFIX, tag)) {
        Some(raw) => Some(
            raw.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid platform version '{}'", raw))?,
        ),
        None => None,
    };

    let required_implementations = props
        .get(&format!("{}{}", ENV_CLASSES_PREFIX, tag))
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(Requirements {
        min_platform_version,
        required_implementations,
    })
}
