//! Retrying calls that fail with watched errors.

use super::backoff::BackoffStrategy;
use super::config::RetryConfig;
use crate::failure::CaughtError;
use gizmos_core::guards::{ensure_in_bounds, ensure_non_negative_secs, ensure_watchable, Bounds};
use gizmos_core::{Error, ErrorFilter, Result, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

/// Calls a function until it succeeds or the attempts run out
///
/// Watched errors are recorded in [`caught`](Self::caught) and retried after
/// a delay; unwatched errors are returned immediately. When every attempt
/// failed the last error is returned if `raise_last` is set, otherwise the
/// call resolves to `Ok(None)`.
///
/// The backoff strategy is applied before every retry except the first one,
/// so a delay of 1s doubled by the strategy sleeps 1s, then 2s, then 4s.
///
/// Reconfiguration takes `&mut self`; a `Retry` is not meant to be shared
/// between concurrent callers.
#[derive(Debug)]
pub struct Retry {
    max_attempts: u32,
    delay: Duration,
    backoff: Option<BackoffStrategy>,
    filter: ErrorFilter,
    raise_last: bool,
    asynchronous: bool,
    attempts: u32,
    caught: Vec<CaughtError>,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            backoff: None,
            filter: ErrorFilter::All,
            raise_last: true,
            asynchronous: false,
            attempts: 0,
            caught: Vec::new(),
        }
    }
}

impl Retry {
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self> {
        let mut retry = Self::default();
        retry.set_max_attempts(max_attempts)?;
        retry.set_delay(delay);
        Ok(retry)
    }

    pub fn from_config(config: &RetryConfig) -> Result<Self> {
        config.validate()?;
        let mut retry = Self::new(config.max_attempts, config.delay())?
            .raise_last(config.raise_last)
            .asynchronous(config.asynchronous)
            .with_filter(config.filter())?;
        retry.set_backoff_strategy(config.backoff.build()?);
        Ok(retry)
    }

    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = Some(strategy);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<ErrorFilter>) -> Result<Self> {
        self.set_filter(filter)?;
        Ok(self)
    }

    #[must_use]
    pub fn raise_last(mut self, raise_last: bool) -> Self {
        self.raise_last = raise_last;
        self
    }

    #[must_use]
    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    /// Call `f` with retries, blocking the thread between attempts
    pub fn call<T, E, F>(&mut self, mut f: F) -> Result<Option<T>>
    where
        F: FnMut() -> std::result::Result<T, E>,
        E: Into<Error>,
    {
        if self.asynchronous {
            return Err(Error::configuration(
                "Retry is configured as asynchronous, use call_async",
            ));
        }

        self.attempts = 0;
        let mut delay = self.delay;
        for attempt in 1..=self.max_attempts {
            self.attempts = attempt;
            let error = match f() {
                Ok(value) => return Ok(Some(value)),
                Err(error) => error.into(),
            };
            match self.settle(attempt, error, &mut delay) {
                ControlFlow::Continue(pause) => {
                    if !pause.is_zero() {
                        std::thread::sleep(pause);
                    }
                }
                ControlFlow::Break(outcome) => return outcome.map(|()| None),
            }
        }
        Ok(None)
    }

    /// Call an async operation with retries, suspending between attempts
    pub async fn call_async<T, E, F, Fut>(&mut self, mut f: F) -> Result<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<Error>,
    {
        if !self.asynchronous {
            return Err(Error::configuration(
                "Retry is configured as synchronous, use call",
            ));
        }

        self.attempts = 0;
        let mut delay = self.delay;
        for attempt in 1..=self.max_attempts {
            self.attempts = attempt;
            let error = match f().await {
                Ok(value) => return Ok(Some(value)),
                Err(error) => error.into(),
            };
            match self.settle(attempt, error, &mut delay) {
                ControlFlow::Continue(pause) => tokio::time::sleep(pause).await,
                ControlFlow::Break(outcome) => return outcome.map(|()| None),
            }
        }
        Ok(None)
    }

    /// Decorate `f` so that every call is retried
    pub fn wrap<'a, A, T, E, F>(&'a mut self, mut f: F) -> impl FnMut(A) -> Result<Option<T>> + 'a
    where
        F: FnMut(A) -> std::result::Result<T, E> + 'a,
        E: Into<Error>,
        A: Clone + 'a,
        T: 'a,
    {
        move |arg| self.call(|| f(arg.clone()))
    }

    /// Decide what follows a failed attempt: another try after a pause, or
    /// the final outcome of the call
    fn settle(
        &mut self,
        attempt: u32,
        error: Error,
        delay: &mut Duration,
    ) -> ControlFlow<Result<()>, Duration> {
        if !self.filter.matches(&error) {
            return ControlFlow::Break(Err(error));
        }
        self.caught.push(CaughtError::new(error.clone()));

        if attempt >= self.max_attempts {
            tracing::warn!(
                attempts = attempt,
                error = %error,
                raise_last = self.raise_last,
                "retry attempts exhausted"
            );
            return ControlFlow::Break(if self.raise_last { Err(error) } else { Ok(()) });
        }

        if attempt > 1 {
            if let Some(backoff) = &self.backoff {
                *delay = backoff.apply(*delay, attempt);
            }
        }
        tracing::warn!(
            attempt,
            max_attempts = self.max_attempts,
            delay = ?*delay,
            error = %error,
            "attempt failed, retrying"
        );
        ControlFlow::Continue(*delay)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn set_max_attempts(&mut self, max_attempts: u32) -> Result<()> {
        ensure_in_bounds("max_attempts", max_attempts, Some(1), None, Bounds::Inclusive)?;
        self.max_attempts = max_attempts;
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Set the delay from fractional seconds, rejecting negative or non-finite values
    pub fn set_delay_secs(&mut self, secs: f64) -> Result<()> {
        let secs = ensure_non_negative_secs("delay", secs)?;
        self.delay = Duration::try_from_secs_f64(secs)
            .map_err(|e| Error::invalid_argument("delay", e.to_string()))?;
        Ok(())
    }

    pub fn backoff_strategy(&self) -> Option<&BackoffStrategy> {
        self.backoff.as_ref()
    }

    pub fn set_backoff_strategy(&mut self, strategy: Option<BackoffStrategy>) {
        self.backoff = strategy;
    }

    pub fn filter(&self) -> &ErrorFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: impl Into<ErrorFilter>) -> Result<()> {
        let filter = filter.into();
        ensure_watchable(&filter)?;
        self.filter = filter;
        Ok(())
    }

    pub fn raises_last(&self) -> bool {
        self.raise_last
    }

    pub fn set_raise_last(&mut self, raise_last: bool) {
        self.raise_last = raise_last;
    }

    pub fn is_asynchronous(&self) -> bool {
        self.asynchronous
    }

    pub fn set_asynchronous(&mut self, asynchronous: bool) {
        self.asynchronous = asynchronous;
    }

    /// Attempts made by the most recent call
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Watched failures across all calls since the last [`clear_caught`](Self::clear_caught)
    pub fn caught(&self) -> &[CaughtError] {
        &self.caught
    }

    pub fn clear_caught(&mut self) {
        self.caught.clear();
    }
}
