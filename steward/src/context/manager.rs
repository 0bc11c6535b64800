//! Per-thread stack of execution contexts.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::Context;
use crate::module::Severity;

/// A stack of contexts owned by one logical thread of work.
///
/// On error the stack is unwound from the top: each context cleans up and
/// says whether it should be removed.
pub struct ContextManager {
    id: u64,
    contexts: Mutex<Vec<Box<dyn Context>>>,
    interrupted: AtomicBool,
}

impl ContextManager {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            contexts: Mutex::new(Vec::new()),
            interrupted: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn push_context(&self, context: Box<dyn Context>) {
        self.contexts.lock().push(context);
    }

    /// Remove and return the top context.
    pub fn pop_context(&self) -> Option<Box<dyn Context>> {
        self.contexts.lock().pop()
    }

    /// Pop contexts until at most `depth` remain.
    pub fn pop_to(&self, depth: usize) {
        let removed: Vec<_> = {
            let mut contexts = self.contexts.lock();
            let keep = depth.min(contexts.len());
            contexts.drain(keep..).collect()
        };
        drop(removed);
    }

    pub fn depth(&self) -> usize {
        self.contexts.lock().len()
    }

    /// Names of the stacked contexts, bottom first.
    pub fn context_names(&self) -> Vec<String> {
        self.contexts
            .lock()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Unwind after an error of `severity`, top first. Contexts that ask to
    /// be removed are popped; the rest stay.
    pub fn cleanup_on_error(&self, severity: Severity) {
        // Cleanup runs unlocked so a context may touch this manager.
        let mut stack = std::mem::take(&mut *self.contexts.lock());
        let mut kept = Vec::with_capacity(stack.len());
        while let Some(mut context) = stack.pop() {
            if !context.cleanup_on_error(severity) {
                kept.push(context);
            }
        }
        kept.reverse();

        let mut contexts = self.contexts.lock();
        kept.append(&mut *contexts);
        *contexts = kept;
    }

    /// Ask the owning thread to stop what it is doing.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextManager")
            .field("id", &self.id)
            .field("contexts", &self.context_names())
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Recording {
        name: &'static str,
        pop: bool,
        seen: Arc<Mutex<Vec<(&'static str, Severity)>>>,
    }

    impl Context for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn cleanup_on_error(&mut self, severity: Severity) -> bool {
            self.seen.lock().push((self.name, severity));
            self.pop
        }
    }

    #[test]
    fn test_cleanup_unwinds_top_first() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let cm = ContextManager::new(1);
        for (name, pop) in [("outer", false), ("middle", true), ("inner", true)] {
            cm.push_context(Box::new(Recording {
                name,
                pop,
                seen: Arc::clone(&seen),
            }));
        }

        cm.cleanup_on_error(Severity::Service);

        let order: Vec<&str> = seen.lock().iter().map(|(n, _)| *n).collect();
        assert_eq!(order, vec!["inner", "middle", "outer"]);
        assert_eq!(cm.context_names(), vec!["outer"]);
    }

    #[test]
    fn test_pop_to_depth() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let cm = ContextManager::new(1);
        for name in ["a", "b", "c"] {
            cm.push_context(Box::new(Recording {
                name,
                pop: true,
                seen: Arc::clone(&seen),
            }));
        }
        cm.pop_to(1);
        assert_eq!(cm.depth(), 1);
        assert_eq!(cm.pop_context().map(|c| c.name().to_string()), Some("a".into()));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_interrupt_flag() {
        let cm = ContextManager::new(7);
        assert!(!cm.is_interrupted());
        cm.interrupt();
        assert!(cm.is_interrupted());
    }
}
