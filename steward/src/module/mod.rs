//! Module contract.
//!
//! A module is any object the registry can instantiate from the catalog,
//! boot inside a service, publish under one or more capability keys and
//! eventually stop. All three lifecycle hooks are optional.

mod error;

pub use error::{ModuleError, Severity};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::monitor::BootContext;
use crate::properties::Properties;

/// Type-erasure helpers so handles can be downcast to their concrete type.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A bootable unit of functionality.
pub trait Module: AsAny {
    /// Start the module. `create` is true when the owning service is being
    /// created rather than reopened. The context gives access to the
    /// registry for booting or finding sibling modules.
    fn boot(
        &self,
        _ctx: &BootContext<'_>,
        _create: bool,
        _properties: &Properties,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Stop the module. Called at most once, without any registry lock held.
    fn stop(&self) {}

    /// Whether this module can serve a request made with `properties`.
    /// Rejected candidates are skipped during resolution.
    fn can_support(&self, _properties: Option<&Properties>) -> bool {
        true
    }
}

impl fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({:p})", self as *const dyn Module as *const ())
    }
}

/// Shared handle to a running module.
pub type ModuleHandle = Arc<dyn Module>;

/// Downcast a handle to its concrete module type.
pub fn downcast<T: Module>(handle: &ModuleHandle) -> Option<Arc<T>> {
    Arc::clone(handle).as_any_arc().downcast::<T>().ok()
}

/// True if both handles point at the same module object.
pub fn same_module(a: &ModuleHandle, b: &ModuleHandle) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl Module for Plain {}

    struct Picky;
    impl Module for Picky {
        fn can_support(&self, properties: Option<&Properties>) -> bool {
            properties.map(|p| p.get_bool("picky.ok")).unwrap_or(false)
        }
    }

    #[test]
    fn test_downcast_to_concrete_type() {
        let handle: ModuleHandle = Arc::new(Plain);
        assert!(downcast::<Plain>(&handle).is_some());
        assert!(downcast::<Picky>(&handle).is_none());
    }

    #[test]
    fn test_same_module_compares_objects() {
        let a: ModuleHandle = Arc::new(Plain);
        let b = Arc::clone(&a);
        let c: ModuleHandle = Arc::new(Plain);
        assert!(same_module(&a, &b));
        assert!(!same_module(&a, &c));
    }

    #[test]
    fn test_default_can_support_accepts_everything() {
        assert!(Plain.can_support(None));
        assert!(!Picky.can_support(None));
        let props = Properties::from_iter([("picky.ok", "true")]);
        assert!(Picky.can_support(Some(&props)));
    }

    #[test]
    fn test_handles_are_debug() {
        let a: ModuleHandle = Arc::new(Plain);
        let c: ModuleHandle = Arc::new(Plain);
        let rendered = format!("{:?}", a);
        assert!(rendered.starts_with("Module("));
        assert_eq!(rendered, format!("{:?}", Arc::clone(&a)));
        assert_ne!(rendered, format!("{:?}", c));

        let missing: Result<ModuleHandle, &str> = Err("not registered");
        assert_eq!(missing.unwrap_err(), "not registered");
    }
}
