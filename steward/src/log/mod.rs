//! Logging abstraction layer.
//!
//! The registry never talks to `tracing` directly. Every component that
//! reports something (catalog assembly, provider resolution, service boot and
//! shutdown) holds an `Arc<dyn Logger>` handed to it by the
//! [`RegistryBuilder`](crate::monitor::RegistryBuilder).
//!
//! # Architecture
//!
//! - `Logger` trait: the sink every component writes to
//! - `TracingLogger`: production adapter that delegates to the `tracing` crate
//! - `NoOpLogger`: silent logger for tests and embedded callers
//! - `CapturingLogger`: in-memory sink, used to assert on diagnostics
//!
//! # Usage
//!
//! ```
//! use steward::log::{Logger, NoOpLogger};
//! use steward::{log_debug, log_info};
//! use std::sync::Arc;
//!
//! struct Loader {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! impl Loader {
//!     fn load(&self, source: &str) {
//!         log_info!(self.logger, "Loading property source {}", source);
//!         log_debug!(self.logger, "Loaded {}", source);
//!     }
//! }
//!
//! let loader = Loader { logger: Arc::new(NoOpLogger) };
//! loader.load("builtin");
//! ```

mod capture;
mod noop;
mod tracing_adapter;
mod r#trait;

pub use capture::{CapturedEntry, CapturingLogger};
pub use noop::NoOpLogger;
pub use r#trait::{LogLevel, Logger};
pub use tracing_adapter::TracingLogger;
