//! Implementation catalogs.
//!
//! A catalog is an ordered list of descriptors naming which registered
//! implementation serves which capability, and under what environment
//! requirements. Catalogs are assembled once, at registry boot, from
//! property sources in precedence order:
//!
//! 1. boot properties passed to the builder
//! 2. the process-wide file named by `STEWARD_PROPERTIES`
//! 3. `steward.properties` in the system home
//! 4. the defaults: the built-in list plus `modules.d/*.properties`
//!
//! Resolution walks the catalogs in that order and returns the first
//! descriptor whose instance accepts the request.

mod assembly;
mod descriptor;
mod implementations;
mod set;

pub use assembly::{
    builtin_defaults, local_catalog, merge_defaults, merge_sources, AssemblyEnv, BUILTIN_ORIGIN,
};
pub use descriptor::{ImplementationDescriptor, Requirements};
pub use implementations::{
    Implementation, ImplementationRegistry, ModuleFactory, ProviderFactory, StorageFactory,
    DIRECTORY_STORAGE, MEMORY_STORAGE,
};
pub use set::{CatalogSet, ExcludedEntry, ImplementationCatalog};
