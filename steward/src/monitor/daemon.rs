//! Background threads owned by the registry.

use std::thread::{self, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Stop signal handed to a daemon task.
///
/// Tasks should poll [`is_stopped`](Self::is_stopped) and return once it is
/// set; the registry joins every daemon during shutdown. Tasks that drive
/// their own runtime can await [`token`](Self::token) instead.
#[derive(Debug, Clone, Default)]
pub struct DaemonSignal {
    shutdown: CancellationToken,
}

impl DaemonSignal {
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Cancellation token cancelled when the registry stops this daemon.
    pub fn token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub(crate) fn stop(&self) {
        self.shutdown.cancel();
    }
}

/// A running daemon thread.
#[derive(Debug)]
pub struct DaemonHandle {
    name: String,
    signal: DaemonSignal,
    thread: Option<JoinHandle<()>>,
}

impl DaemonHandle {
    pub(crate) fn new(name: String, signal: DaemonSignal, thread: JoinHandle<()>) -> Self {
        Self {
            name,
            signal,
            thread: Some(thread),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Signal the task and wait for it. Returns false if the thread
    /// panicked. Called from the daemon's own thread, only signals.
    pub(crate) fn stop_and_join(&mut self) -> bool {
        self.signal.stop();
        match self.thread.take() {
            Some(thread) if thread.thread().id() == thread::current().id() => true,
            Some(thread) => thread.join().is_ok(),
            None => true,
        }
    }
}
