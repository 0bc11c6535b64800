//! In-memory logger that records every message.

use crate::log::{LogLevel, Logger};
use parking_lot::Mutex;
use std::fmt::Arguments;

/// A single recorded log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Logger that keeps every message in memory.
///
/// Handy for asserting that catalog assembly reported a duplicate key or an
/// excluded implementation without installing a tracing subscriber.
#[derive(Debug, Default)]
pub struct CapturingLogger {
    entries: Mutex<Vec<CapturedEntry>>,
}

impl CapturingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far, oldest first.
    pub fn entries(&self) -> Vec<CapturedEntry> {
        self.entries.lock().clone()
    }

    /// True if any entry at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    /// Number of entries recorded at `level` or above.
    pub fn count_at_least(&self, level: LogLevel) -> usize {
        self.entries.lock().iter().filter(|e| e.level >= level).count()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Logger for CapturingLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        self.entries.lock().push(CapturedEntry {
            level,
            message: args.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{log_info, log_warn};

    #[test]
    fn test_capturing_logger_records_in_order() {
        let logger = CapturingLogger::new();
        log_info!(logger, "first {}", 1);
        log_warn!(logger, "second");

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first 1");
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert!(logger.contains(LogLevel::Warn, "sec"));
        assert!(!logger.contains(LogLevel::Info, "sec"));
        assert_eq!(logger.count_at_least(LogLevel::Warn), 1);
    }

    #[test]
    fn test_capturing_logger_clear() {
        let logger = CapturingLogger::new();
        log_info!(logger, "x");
        logger.clear();
        assert!(logger.entries().is_empty());
    }
}
