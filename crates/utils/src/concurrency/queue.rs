//! Fixed-size worker pool consuming a shared task queue.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use gizmos_core::guards::{ensure_in_bounds, Bounds};
use gizmos_core::{Error, Result, DEFAULT_QUEUE_POLL_INTERVAL, DEFAULT_QUEUE_WORKERS};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const COMPONENT: &str = "QueueProcessor";

/// Item travelling through the queue
#[derive(Debug)]
pub enum Message<T> {
    Task(T),
    /// Sentinel telling the worker that receives it to exit
    Stop,
}

/// What a worker does when the process function fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the error and keep consuming tasks
    #[default]
    Log,
    /// Remember the first error, shut every worker down and report it from `stop`
    Fatal,
}

/// Serializable configuration for [`QueueProcessor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub workers: usize,
    pub poll_interval_ms: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_QUEUE_WORKERS,
            poll_interval_ms: u64::try_from(DEFAULT_QUEUE_POLL_INTERVAL.as_millis())
                .unwrap_or(u64::MAX),
            failure_policy: FailurePolicy::Log,
        }
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_in_bounds("workers", self.workers, Some(1), None, Bounds::Inclusive)?;
        ensure_in_bounds("poll_interval_ms", self.poll_interval_ms, Some(0), None, Bounds::Exclusive)
    }
}

type ProcessFn<T> = Arc<dyn Fn(T) -> Result<()> + Send + Sync>;

/// State shared between the processor and its workers
#[derive(Default)]
struct Shared {
    shutdown: AtomicBool,
    fatal: Mutex<Option<Error>>,
}

/// Cloneable producer side of a [`QueueProcessor`]
pub struct QueueHandle<T> {
    tx: Sender<Message<T>>,
}

impl<T> Clone for QueueHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> QueueHandle<T> {
    pub fn add_task(&self, item: T) -> Result<()> {
        send(&self.tx, Message::Task(item))
    }
}

impl<T> fmt::Debug for QueueHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueHandle")
            .field("pending", &self.tx.len())
            .finish()
    }
}

fn send<T>(tx: &Sender<Message<T>>, message: Message<T>) -> Result<()> {
    tx.send(message)
        .map_err(|_| Error::worker_failed(COMPONENT, "task queue is closed"))
}

/// Runs a process function over queued tasks on a fixed number of threads
///
/// Tasks can be queued before `start`, while running, and after `stop`;
/// tasks still queued when the processor stops are kept for the next run.
/// `stop` drains the workers with one sentinel per worker and waits for
/// all of them.
pub struct QueueProcessor<T: Send + 'static> {
    workers: usize,
    process: ProcessFn<T>,
    policy: FailurePolicy,
    poll_interval: Duration,
    tx: Sender<Message<T>>,
    rx: Receiver<Message<T>>,
    handles: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl<T: Send + 'static> QueueProcessor<T> {
    pub fn new<F, E>(workers: usize, process: F) -> Result<Self>
    where
        F: Fn(T) -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Into<Error>,
    {
        ensure_in_bounds("workers", workers, Some(1), None, Bounds::Inclusive)?;
        let (tx, rx) = channel::unbounded();
        Ok(Self {
            workers,
            process: Arc::new(move |item| process(item).map_err(Into::into)),
            policy: FailurePolicy::default(),
            poll_interval: DEFAULT_QUEUE_POLL_INTERVAL,
            tx,
            rx,
            handles: Vec::new(),
            shared: Arc::new(Shared::default()),
        })
    }

    pub fn from_config<F, E>(config: &QueueConfig, process: F) -> Result<Self>
    where
        F: Fn(T) -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Into<Error>,
    {
        config.validate()?;
        Self::new(config.workers, process)?
            .with_failure_policy(config.failure_policy)
            .with_poll_interval(config.poll_interval())
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// How long an idle worker waits before rechecking for shutdown
    pub fn with_poll_interval(mut self, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::invalid_argument("poll_interval", "must be > 0"));
        }
        self.poll_interval = interval;
        Ok(self)
    }

    /// Spawn the workers
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::reactivation(COMPONENT));
        }

        self.shared.shutdown.store(false, Ordering::SeqCst);
        for index in 0..self.workers {
            let worker = Worker {
                name: format!("gizmos-queue-{index}"),
                rx: self.rx.clone(),
                process: Arc::clone(&self.process),
                policy: self.policy,
                poll_interval: self.poll_interval,
                shared: Arc::clone(&self.shared),
            };
            let spawned = thread::Builder::new()
                .name(worker.name.clone())
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => self.handles.push(handle),
                Err(e) => {
                    // leave no half-started pool behind
                    let _ = self.stop();
                    return Err(Error::worker_failed(
                        format!("gizmos-queue-{index}"),
                        format!("failed to spawn: {e}"),
                    ));
                }
            }
        }

        tracing::debug!(workers = self.workers, policy = ?self.policy, "queue processor started");
        Ok(())
    }

    /// Send one sentinel per worker, wait for all of them and report a fatal failure
    pub fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Err(Error::not_started(COMPONENT));
        }

        for _ in 0..self.handles.len() {
            send(&self.tx, Message::Stop)?;
        }

        let mut failure = None;
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or(COMPONENT).to_string();
            if let Err(payload) = handle.join() {
                let error = Error::worker_failed(name, Error::from_panic(&*payload).to_string());
                tracing::error!(error = %error, "queue worker panicked");
                failure.get_or_insert(error);
            }
        }

        // sentinels not consumed by a worker that exited early stay in the queue
        let leftover: Vec<_> = self
            .rx
            .try_iter()
            .filter(|message| matches!(message, Message::Task(_)))
            .collect();
        for message in leftover {
            send(&self.tx, message)?;
        }

        self.shared.shutdown.store(false, Ordering::SeqCst);
        tracing::debug!(pending = self.pending(), "queue processor stopped");

        match self.shared.fatal.lock().take().or(failure) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Queue an item for processing
    pub fn add_task(&self, item: T) -> Result<()> {
        send(&self.tx, Message::Task(item))
    }

    /// Producer handle that can be moved to other threads
    pub fn handle(&self) -> QueueHandle<T> {
        QueueHandle {
            tx: self.tx.clone(),
        }
    }

    /// Number of queued messages not yet taken by a worker
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }
}

impl<T: Send + 'static> fmt::Debug for QueueProcessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueProcessor")
            .field("workers", &self.workers)
            .field("policy", &self.policy)
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .finish()
    }
}

impl<T: Send + 'static> Drop for QueueProcessor<T> {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.stop() {
                tracing::error!(error = %e, "queue processor failed while shutting down");
            }
        }
    }
}

struct Worker<T> {
    name: String,
    rx: Receiver<Message<T>>,
    process: ProcessFn<T>,
    policy: FailurePolicy,
    poll_interval: Duration,
    shared: Arc<Shared>,
}

impl<T> Worker<T> {
    fn run(self) {
        tracing::trace!(worker = %self.name, "queue worker started");
        while !self.shared.shutdown.load(Ordering::SeqCst) {
            let item = match self.rx.recv_timeout(self.poll_interval) {
                Ok(Message::Task(item)) => item,
                Ok(Message::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => continue,
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.process)(item)))
                .unwrap_or_else(|payload| Err(Error::from_panic(&*payload)));
            let Err(error) = outcome else {
                continue;
            };

            match self.policy {
                FailurePolicy::Log => {
                    tracing::error!(worker = %self.name, error = %error, "task failed");
                }
                FailurePolicy::Fatal => {
                    tracing::error!(worker = %self.name, error = %error, "task failed, shutting down");
                    self.shared.fatal.lock().get_or_insert(error);
                    self.shared.shutdown.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }
        tracing::trace!(worker = %self.name, "queue worker exited");
    }
}
