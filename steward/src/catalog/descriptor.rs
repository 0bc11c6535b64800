//! Catalog entries.

use std::fmt;

use super::implementations::ModuleFactory;
use crate::capability::CapabilityId;
use crate::module::{ModuleError, ModuleHandle};
use crate::properties::SourceKind;

/// Environment a descriptor needs before it is admitted to a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    /// Lowest platform version the implementation runs on
    pub min_platform_version: Option<u32>,
    /// Implementations that must also be registered
    pub required_implementations: Vec<String>,
}

/// One `steward.module.<tag>` entry that passed environment filtering.
#[derive(Clone)]
pub struct ImplementationDescriptor {
    pub tag: String,
    /// Registered implementation name
    pub implementation: String,
    pub capabilities: Vec<CapabilityId>,
    pub requirements: Requirements,
    pub source: SourceKind,
    factory: ModuleFactory,
}

impl ImplementationDescriptor {
    pub(crate) fn new(
        tag: impl Into<String>,
        implementation: impl Into<String>,
        capabilities: Vec<CapabilityId>,
        requirements: Requirements,
        source: SourceKind,
        factory: ModuleFactory,
    ) -> Self {
        Self {
            tag: tag.into(),
            implementation: implementation.into(),
            capabilities,
            requirements,
            source,
            factory,
        }
    }

    /// Whether this implementation serves `capability`.
    pub fn provides(&self, capability: &CapabilityId) -> bool {
        self.capabilities.contains(capability)
    }

    /// Ordering rank within a source; platform-specific entries outrank
    /// generic ones.
    pub fn rank(&self) -> u32 {
        self.requirements.min_platform_version.unwrap_or(0)
    }

    /// Create a fresh, unbooted instance.
    pub fn instantiate(&self) -> Result<ModuleHandle, ModuleError> {
        (self.factory)()
    }
}

impl fmt::Debug for ImplementationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplementationDescriptor")
            .field("tag", &self.tag)
            .field("implementation", &self.implementation)
            .field("capabilities", &self.capabilities)
            .field("requirements", &self.requirements)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
