//! Capability identity.
//!
//! A capability is the contract a module fulfils ("Logger",
//! "StorageFactory", ...). Capabilities are named, not typed: catalog
//! sources and persisted descriptors refer to them by name, so two
//! [`CapabilityId`]s denote the same capability exactly when their names are
//! equal.

use std::borrow::Cow;
use std::fmt;

/// Name of a capability.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapabilityId(Cow<'static, str>);

impl CapabilityId {
    /// Capability id usable in `const` position.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CapabilityId {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// Identity of a capability request: the capability plus an optional
/// instance identifier.
///
/// Keys are immutable once built and are used as the publication key inside
/// a running service, so "the same capability under another name" and "a
/// different capability" never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityKey {
    capability: CapabilityId,
    identifier: Option<String>,
}

impl CapabilityKey {
    pub fn new(capability: impl Into<CapabilityId>, identifier: Option<&str>) -> Self {
        Self {
            capability: capability.into(),
            identifier: identifier.map(str::to_string),
        }
    }

    /// Key for a named instance.
    pub fn named(capability: impl Into<CapabilityId>, identifier: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            identifier: Some(identifier.into()),
        }
    }

    pub fn capability(&self) -> &CapabilityId {
        &self.capability
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(id) => write!(f, "{} ({})", self.capability, id),
            None => write!(f, "{}", self.capability),
        }
    }
}
