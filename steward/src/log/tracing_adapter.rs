//! Tracing library adapter implementation.

use crate::log::{LogLevel, Logger};
use std::fmt::Arguments;

/// Logger implementation that delegates to the `tracing` crate.
///
/// Used by the CLI once [`init_logging`](crate::logging::init_logging) has
/// installed a subscriber. Events are emitted under the `steward` target so
/// they can be filtered with `RUST_LOG=steward=debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// Create a new tracing logger adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        match level {
            LogLevel::Trace => tracing::trace!(target: "steward", "{}", args),
            LogLevel::Debug => tracing::debug!(target: "steward", "{}", args),
            LogLevel::Info => tracing::info!(target: "steward", "{}", args),
            LogLevel::Warn => tracing::warn!(target: "steward", "{}", args),
            LogLevel::Error => tracing::error!(target: "steward", "{}", args),
        }
    }
}
