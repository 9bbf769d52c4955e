//! Thread based timeout executor, available on every platform.

use super::{CancellableExecutor, Completion};
use crossbeam::channel::{self, RecvTimeoutError};
use gizmos_core::{Error, Result};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

/// Runs each task on a dedicated worker thread and waits for it with a deadline
///
/// A worker that misses the deadline is abandoned, not killed: it keeps
/// running until the task returns and its result is dropped.
#[derive(Debug, Clone)]
pub struct WatcherExecutor {
    name: String,
}

impl WatcherExecutor {
    /// `name` labels the worker thread
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for WatcherExecutor {
    fn default() -> Self {
        Self::new("gizmos-timeout")
    }
}

impl CancellableExecutor for WatcherExecutor {
    fn run_with_timeout<T, F>(&self, task: F, cutoff: Duration) -> Result<Completion<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = channel::bounded(1);
        let worker = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(task))
                    .unwrap_or_else(|payload| Err(Error::from_panic(&*payload)));
                // the receiver is gone once the deadline passed
                let _ = tx.send(outcome);
            })
            .map_err(|e| Error::worker_failed(&self.name, format!("failed to spawn: {e}")))?;

        match rx.recv_timeout(cutoff) {
            Ok(outcome) => {
                let _ = worker.join();
                Ok(Completion::Finished(outcome))
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::debug!(worker = %self.name, cutoff = ?cutoff, "abandoning timed out worker");
                Ok(Completion::TimedOut)
            }
            Err(RecvTimeoutError::Disconnected) => Ok(Completion::Finished(Err(
                Error::worker_failed(&self.name, "worker exited without a result"),
            ))),
        }
    }
}
