//! Persistent-service providers.
//!
//! A provider owns a naming scheme (`directory`, `memory`, ...) and knows how
//! to canonicalize names in that scheme, where a service's durable root
//! lives, and how to load and save its descriptor.
//!
//! # Providers
//!
//! - [`DirectoryService`] - service roots are directories under the system home
//! - [`MemoryService`] - service roots live in process memory (`memory:name`)
//!
//! [`ServiceProviderRegistry`] maps scheme prefixes to providers.

mod directory;
mod memory;
mod registry;
mod types;

pub use directory::{DirectoryService, SERVICE_PROPERTIES_FILE};
pub use memory::MemoryService;
pub use registry::ServiceProviderRegistry;
pub use types::{NameMatch, PersistentService, StorageEnv, DIRECTORY_SCHEME, MEMORY_SCHEME};
pub(crate) use types::scheme_of;
