//! Bounding how long a call may run.
//!
//! [`Timeout`] runs a call through a [`CancellableExecutor`] picked by its
//! [`TimeoutStrategy`]:
//!
//! - [`signal`] - `SIGALRM` on the calling thread (Unix only)
//! - [`watcher`] - a worker thread waited on with a deadline (any platform)
//!
//! The watcher is the default on every platform: control returns to the
//! caller at the cutoff and the worker is left to finish on its own. The
//! signal strategy is opt-in and only reports an overrun after the call
//! returns, because blocking Rust code cannot be preempted from a signal
//! handler. Futures are cancelled for real by [`Timeout::call_async`].

#[cfg(unix)]
pub mod signal;
pub mod watcher;

use gizmos_core::guards::{ensure_in_bounds, ensure_non_negative_secs, Bounds};
use gizmos_core::{Error, Result, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use watcher::WatcherExecutor;

#[cfg(unix)]
pub use signal::SignalExecutor;

/// Outcome of running a task under a deadline
#[derive(Debug)]
pub enum Completion<T> {
    /// The task returned in time
    Finished(Result<T>),
    /// The deadline passed first; any result is discarded
    TimedOut,
}

/// Runs a task and reports whether it beat the cutoff
pub trait CancellableExecutor {
    fn run_with_timeout<T, F>(&self, task: F, cutoff: Duration) -> Result<Completion<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static;
}

/// How a [`Timeout`] enforces its cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutStrategy {
    /// One-shot `SIGALRM`, Unix only
    ///
    /// Reports an overrun after the call returns; it never cuts a call
    /// short. Only one alarm exists per process, so concurrent signal
    /// timeouts on other threads fail with `Busy`.
    Signal,
    /// Worker thread with a deadline
    Watcher,
}

impl TimeoutStrategy {
    /// Strategy used when none is configured
    ///
    /// Always the watcher, the only strategy that returns at the cutoff.
    pub fn detect() -> Self {
        TimeoutStrategy::Watcher
    }

    /// Whether this strategy can run on the current platform
    pub fn is_supported(self) -> bool {
        match self {
            TimeoutStrategy::Signal => cfg!(unix),
            TimeoutStrategy::Watcher => true,
        }
    }
}

type ErrorFactory = Arc<dyn Fn(&str, Duration) -> Error + Send + Sync>;

/// Raises an error when a call runs longer than its cutoff
///
/// Works both as a scoped call ([`call`](Self::call)) and as a decorator
/// ([`wrap`](Self::wrap)), whichever strategy is in use.
#[derive(Clone)]
pub struct Timeout {
    cutoff: Duration,
    strategy: TimeoutStrategy,
    operation: Option<String>,
    error: ErrorFactory,
}

impl Timeout {
    /// Create a timeout using the watcher strategy
    pub fn new(cutoff: Duration) -> Result<Self> {
        let mut timeout = Self {
            cutoff: DEFAULT_TIMEOUT,
            strategy: TimeoutStrategy::detect(),
            operation: None,
            error: Arc::new(|operation: &str, cutoff: Duration| Error::timeout(operation, cutoff)),
        };
        timeout.set_cutoff(cutoff)?;
        Ok(timeout)
    }

    pub fn from_secs_f64(cutoff: f64) -> Result<Self> {
        Self::new(secs_to_duration(cutoff)?)
    }

    pub fn from_config(config: &TimeoutConfig) -> Result<Self> {
        config.validate()?;
        let timeout = Self::new(config.cutoff())?;
        match config.strategy {
            Some(strategy) => timeout.with_strategy(strategy),
            None => Ok(timeout),
        }
    }

    pub fn with_strategy(mut self, strategy: TimeoutStrategy) -> Result<Self> {
        self.set_strategy(strategy)?;
        Ok(self)
    }

    /// Label used in the default timeout error instead of the function's type name
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Error to raise on overrun, built from the operation label and the cutoff
    #[must_use]
    pub fn with_error<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str, Duration) -> Error + Send + Sync + 'static,
    {
        self.error = Arc::new(factory);
        self
    }

    /// Run `f`, failing with the configured error if it overruns the cutoff
    pub fn call<T, E, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        E: Into<Error>,
        T: Send + 'static,
    {
        let operation = self
            .operation
            .clone()
            .unwrap_or_else(|| type_name::<F>().to_string());
        let _span = crate::tracing::operation_span("timeout", &operation).entered();
        let task = move || f().map_err(Into::into);

        let completion = match self.strategy {
            TimeoutStrategy::Watcher => {
                WatcherExecutor::new(format!("timeout-{}", short_name(&operation)))
                    .run_with_timeout(task, self.cutoff)?
            }
            TimeoutStrategy::Signal => self.run_with_signal(task)?,
        };

        match completion {
            Completion::Finished(outcome) => outcome,
            Completion::TimedOut => {
                tracing::warn!(operation = %operation, cutoff = ?self.cutoff, "call timed out");
                Err((self.error)(&operation, self.cutoff))
            }
        }
    }

    #[cfg(unix)]
    fn run_with_signal<T, F>(&self, task: F) -> Result<Completion<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        SignalExecutor.run_with_timeout(task, self.cutoff)
    }

    #[cfg(not(unix))]
    fn run_with_signal<T, F>(&self, _task: F) -> Result<Completion<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        Err(Error::unsupported_platform(
            std::env::consts::OS,
            "the signal timeout strategy needs a Unix host",
        ))
    }

    /// Decorate `f` so that every call is bounded by the cutoff
    pub fn wrap<'a, A, T, E, F>(&'a self, f: F) -> impl Fn(A) -> Result<T> + 'a
    where
        F: Fn(A) -> std::result::Result<T, E> + Clone + Send + 'static,
        A: Send + 'static,
        E: Into<Error>,
        T: Send + 'static,
    {
        let operation = self
            .operation
            .clone()
            .unwrap_or_else(|| type_name::<F>().to_string());
        move |arg| {
            let f = f.clone();
            self.clone()
                .with_operation(operation.clone())
                .call(move || f(arg))
        }
    }

    /// Bound a future, dropping it at its next suspension point once the cutoff passes
    pub async fn call_async<T, E, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<Error>,
    {
        match tokio::time::timeout(self.cutoff, fut).await {
            Ok(outcome) => outcome.map_err(Into::into),
            Err(_) => {
                let operation = self
                    .operation
                    .clone()
                    .unwrap_or_else(|| type_name::<Fut>().to_string());
                tracing::warn!(operation = %operation, cutoff = ?self.cutoff, "future timed out");
                Err((self.error)(&operation, self.cutoff))
            }
        }
    }

    pub fn cutoff(&self) -> Duration {
        self.cutoff
    }

    /// The cutoff must be greater than zero
    pub fn set_cutoff(&mut self, cutoff: Duration) -> Result<()> {
        if cutoff.is_zero() {
            return Err(Error::invalid_argument("cutoff", "0 must be > 0"));
        }
        self.cutoff = cutoff;
        Ok(())
    }

    pub fn set_cutoff_secs(&mut self, cutoff: f64) -> Result<()> {
        self.set_cutoff(secs_to_duration(cutoff)?)
    }

    pub fn strategy(&self) -> TimeoutStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: TimeoutStrategy) -> Result<()> {
        if !strategy.is_supported() {
            return Err(Error::unsupported_platform(
                std::env::consts::OS,
                format!("the {strategy:?} timeout strategy is not available here"),
            ));
        }
        self.strategy = strategy;
        Ok(())
    }

    pub fn set_error<F>(&mut self, factory: F)
    where
        F: Fn(&str, Duration) -> Error + Send + Sync + 'static,
    {
        self.error = Arc::new(factory);
    }
}

impl fmt::Debug for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeout")
            .field("cutoff", &self.cutoff)
            .field("strategy", &self.strategy)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

fn secs_to_duration(secs: f64) -> Result<Duration> {
    let secs = ensure_non_negative_secs("cutoff", secs)?;
    Duration::try_from_secs_f64(secs).map_err(|e| Error::invalid_argument("cutoff", e.to_string()))
}

/// Last path segment of a type name, for thread names
fn short_name(operation: &str) -> &str {
    operation
        .trim_end_matches("::{{closure}}")
        .rsplit("::")
        .next()
        .unwrap_or(operation)
}

/// Serializable configuration for [`Timeout`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub cutoff_ms: u64,
    /// Strategy override; the watcher when absent
    pub strategy: Option<TimeoutStrategy>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            cutoff_ms: u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            strategy: None,
        }
    }
}

impl TimeoutConfig {
    pub fn cutoff(&self) -> Duration {
        Duration::from_millis(self.cutoff_ms)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_in_bounds("cutoff_ms", self.cutoff_ms, Some(0), None, Bounds::Exclusive)?;
        if let Some(strategy) = self.strategy {
            if !strategy.is_supported() {
                return Err(Error::configuration(format!(
                    "timeout strategy {strategy:?} is not supported on {}",
                    std::env::consts::OS
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gizmos_core::ErrorKind;
    use serial_test::serial;
    use std::thread;

    #[test]
    fn test_cutoff_must_be_positive() {
        assert_eq!(
            Timeout::new(Duration::ZERO).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert!(Timeout::from_secs_f64(-0.5).is_err());
        assert!(Timeout::from_secs_f64(f64::NAN).is_err());

        let mut timeout = Timeout::from_secs_f64(0.5).unwrap();
        assert_eq!(timeout.cutoff(), Duration::from_millis(500));
        assert!(timeout.set_cutoff_secs(0.0).is_err());
        assert_eq!(timeout.cutoff(), Duration::from_millis(500));
    }

    #[test]
    fn test_default_strategy_returns_at_the_cutoff() {
        let timeout = Timeout::new(Duration::from_millis(100)).unwrap();
        assert_eq!(timeout.strategy(), TimeoutStrategy::Watcher);

        let start = std::time::Instant::now();
        let err = timeout
            .call(|| {
                thread::sleep(Duration::from_secs(2));
                Ok::<_, Error>(())
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_default_timeouts_on_separate_threads_do_not_collide() {
        let background = thread::spawn(|| {
            Timeout::new(Duration::from_secs(1)).unwrap().call(|| {
                thread::sleep(Duration::from_millis(300));
                Ok::<_, Error>(1)
            })
        });
        thread::sleep(Duration::from_millis(50));

        let value = Timeout::new(Duration::from_secs(1))
            .unwrap()
            .call(|| Ok::<_, Error>(2))
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(background.join().unwrap().unwrap(), 1);
    }

    #[cfg(unix)]
    #[test]
    #[serial(sigalrm)]
    fn test_signal_strategy_is_busy_across_threads() {
        let signal = Timeout::new(Duration::from_secs(1))
            .unwrap()
            .with_strategy(TimeoutStrategy::Signal)
            .unwrap();
        let background = {
            let signal = signal.clone();
            thread::spawn(move || {
                signal.call(|| {
                    thread::sleep(Duration::from_millis(300));
                    Ok::<_, Error>(())
                })
            })
        };
        thread::sleep(Duration::from_millis(50));

        let err = signal.call(|| Ok::<_, Error>(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Busy);
        background.join().unwrap().unwrap();
    }

    #[test]
    fn test_watcher_times_out_with_configured_error() {
        let timeout = Timeout::new(Duration::from_millis(100))
            .unwrap()
            .with_strategy(TimeoutStrategy::Watcher)
            .unwrap()
            .with_operation("slow")
            .with_error(|op, _| Error::custom("TooSlow", op));

        let err = timeout
            .call(|| {
                thread::sleep(Duration::from_secs(1));
                Ok::<_, Error>(())
            })
            .unwrap_err();
        assert_eq!(err.name(), "TooSlow");
        assert_eq!(err.to_string(), "TooSlow: slow");

        let value = timeout
            .call(|| {
                thread::sleep(Duration::from_millis(10));
                Ok::<_, Error>(7)
            })
            .unwrap();
        assert_eq!(value, 7);
    }

    #[cfg(unix)]
    #[test]
    #[serial(sigalrm)]
    fn test_signal_strategy_both_forms() {
        let timeout = Timeout::new(Duration::from_millis(100))
            .unwrap()
            .with_strategy(TimeoutStrategy::Signal)
            .unwrap();

        let err = timeout
            .call(|| {
                thread::sleep(Duration::from_millis(400));
                Ok::<_, Error>(())
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let double = timeout.wrap(|x: u32| Ok::<_, Error>(x * 2));
        assert_eq!(double(21).unwrap(), 42);
    }

    #[test]
    fn test_config_round_trip_into_timeout() {
        let config: TimeoutConfig =
            serde_json::from_str(r#"{"cutoff_ms": 250, "strategy": "watcher"}"#).unwrap();
        let timeout = Timeout::from_config(&config).unwrap();
        assert_eq!(timeout.cutoff(), Duration::from_millis(250));
        assert_eq!(timeout.strategy(), TimeoutStrategy::Watcher);

        let zero = TimeoutConfig {
            cutoff_ms: 0,
            strategy: None,
        };
        assert!(zero.validate().is_err());
    }

    #[tokio::test]
    async fn test_call_async_cancels_future() {
        let timeout = Timeout::new(Duration::from_millis(50)).unwrap();

        let err = timeout
            .call_async(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, Error>(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let value = timeout.call_async(async { Ok::<_, Error>("quick") }).await.unwrap();
        assert_eq!(value, "quick");
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("my_crate::jobs::fetch::{{closure}}"), "fetch");
        assert_eq!(short_name("fetch"), "fetch");
    }
}
