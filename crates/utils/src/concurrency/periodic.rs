//! Background task repeated on a fixed interval.

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use gizmos_core::{Error, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const COMPONENT: &str = "PeriodicTask";

/// Calls a closure every `interval` on a background thread until stopped
///
/// The first call happens immediately. Errors and panics from the closure
/// are logged and do not end the task.
#[derive(Debug)]
pub struct PeriodicTask {
    interval: Duration,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    runs: Arc<AtomicU64>,
}

impl PeriodicTask {
    pub fn start<F, E>(interval: Duration, mut func: F) -> Result<Self>
    where
        F: FnMut() -> std::result::Result<(), E> + Send + 'static,
        E: Into<Error>,
    {
        if interval.is_zero() {
            return Err(Error::invalid_argument("interval", "must be > 0"));
        }

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let runs = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&runs);

        let handle = thread::Builder::new()
            .name("gizmos-periodic".to_string())
            .spawn(move || loop {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| func().map_err(Into::into)))
                    .unwrap_or_else(|payload| Err(Error::from_panic(&*payload)));
                counter.fetch_add(1, Ordering::SeqCst);
                if let Err(error) = outcome {
                    tracing::error!(error = %error, "periodic task failed");
                }

                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| Error::worker_failed(COMPONENT, format!("failed to spawn: {e}")))?;

        tracing::debug!(interval = ?interval, "periodic task started");
        Ok(Self {
            interval,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            runs,
        })
    }

    /// Wake the background thread and wait for it to finish
    pub fn stop(&mut self) -> Result<()> {
        let (Some(stop_tx), Some(handle)) = (self.stop_tx.take(), self.handle.take()) else {
            return Err(Error::not_started(COMPONENT));
        };

        // the thread may already be gone
        let _ = stop_tx.send(());
        handle.join().map_err(|payload| {
            Error::worker_failed(COMPONENT, Error::from_panic(&*payload).to_string())
        })?;
        tracing::debug!(runs = self.runs(), "periodic task stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Completed invocations so far
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.stop() {
                tracing::error!(error = %e, "periodic task failed while stopping");
            }
        }
    }
}
