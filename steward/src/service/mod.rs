//! Running services.
//!
//! A [`RunningService`] owns the modules booted inside one service and the
//! table they are published under. The registry keeps one per named service
//! plus the free-floating pool for modules booted outside any service.

mod instance;
mod locale;
mod running;
mod state;

pub use instance::ModuleInstance;
pub use locale::ServiceLocale;
pub use running::RunningService;
pub use state::ServiceState;
