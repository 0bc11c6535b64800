//! Process-wide tracking of context managers.

use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::{Context, ContextManager};
use crate::module::Severity;

static NEXT_SERVICE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Current manager per context service on this thread.
    static CURRENT: RefCell<HashMap<u64, Arc<ContextManager>>> = RefCell::new(HashMap::new());
}

/// Hands out context managers and remembers which are live, so shutdown can
/// interrupt every thread still working inside the registry.
pub struct ContextService {
    id: u64,
    next_manager: AtomicU64,
    active: Mutex<Vec<Weak<ContextManager>>>,
}

impl ContextService {
    pub fn new() -> Self {
        Self {
            id: NEXT_SERVICE_ID.fetch_add(1, Ordering::Relaxed),
            next_manager: AtomicU64::new(1),
            active: Mutex::new(Vec::new()),
        }
    }

    /// A fresh manager, tracked until the last handle to it is dropped.
    pub fn new_context_manager(&self) -> Arc<ContextManager> {
        let cm = Arc::new(ContextManager::new(
            self.next_manager.fetch_add(1, Ordering::Relaxed),
        ));
        let mut active = self.active.lock();
        active.retain(|w| w.strong_count() > 0);
        active.push(Arc::downgrade(&cm));
        cm
    }

    /// This thread's current manager.
    pub fn current(&self) -> Option<Arc<ContextManager>> {
        CURRENT.with(|current| current.borrow().get(&self.id).cloned())
    }

    pub fn set_current(&self, cm: Arc<ContextManager>) {
        CURRENT.with(|current| {
            current.borrow_mut().insert(self.id, cm);
        });
    }

    /// Clear this thread's current manager if it is `cm`.
    pub fn reset_current(&self, cm: &Arc<ContextManager>) {
        CURRENT.with(|current| {
            let mut current = current.borrow_mut();
            if current
                .get(&self.id)
                .is_some_and(|existing| Arc::ptr_eq(existing, cm))
            {
                current.remove(&self.id);
            }
        });
    }

    /// Interrupt every live manager. Returns how many were notified.
    pub fn notify_all_active(&self) -> usize {
        let live: Vec<Arc<ContextManager>> = {
            let mut active = self.active.lock();
            active.retain(|w| w.strong_count() > 0);
            active.iter().filter_map(Weak::upgrade).collect()
        };
        for cm in &live {
            cm.interrupt();
        }
        live.len()
    }

    /// Number of managers still alive.
    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

impl Default for ContextService {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope that pushes a context onto the thread's current manager, creating
/// and installing a manager first if the thread has none.
///
/// Finish with [`complete`](Self::complete) or [`fail`](Self::fail). A scope
/// dropped without either (a panic in between) unwinds as a system failure.
pub struct ContextScope<'a> {
    service: &'a ContextService,
    manager: Arc<ContextManager>,
    created: bool,
    depth: usize,
    finished: bool,
}

impl<'a> ContextScope<'a> {
    pub fn enter(service: &'a ContextService, context: Box<dyn Context>) -> Self {
        let (manager, created) = match service.current() {
            Some(cm) => (cm, false),
            None => {
                let cm = service.new_context_manager();
                service.set_current(Arc::clone(&cm));
                (cm, true)
            }
        };
        let depth = manager.depth();
        manager.push_context(context);
        Self {
            service,
            manager,
            created,
            depth,
            finished: false,
        }
    }

    pub fn manager(&self) -> &Arc<ContextManager> {
        &self.manager
    }

    /// Whether this scope installed the thread's manager.
    pub fn created_manager(&self) -> bool {
        self.created
    }

    /// Leave normally, popping the scope's context.
    pub fn complete(mut self) {
        self.finish(None);
    }

    /// Leave after an error. A manager created by this scope is unwound
    /// in full; otherwise only the scope's own context is removed and the
    /// outer owner handles the rest.
    pub fn fail(mut self, severity: Severity) {
        self.finish(Some(severity));
    }

    fn finish(&mut self, error: Option<Severity>) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let (Some(severity), true) = (error, self.created) {
            self.manager.cleanup_on_error(severity);
        }
        self.manager.pop_to(self.depth);
        if self.created {
            self.service.reset_current(&self.manager);
        }
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        self.finish(Some(Severity::System));
    }
}
