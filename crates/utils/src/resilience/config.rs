//! Serializable configuration for retry and rate limiting behavior.

use super::backoff::BackoffConfig;
use gizmos_core::guards::{ensure_in_bounds, ensure_no_duplicates, Bounds};
use gizmos_core::{
    ErrorFilter, ErrorKind, Result, DEFAULT_MAX_ATTEMPTS, DEFAULT_RATE_LIMIT_INTERVAL,
    DEFAULT_RETRY_DELAY,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`Retry`](super::Retry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of attempts, including the first call
    pub max_attempts: u32,
    /// Delay before the first retry
    pub delay_ms: u64,
    /// How the delay grows between retries
    pub backoff: BackoffConfig,
    /// Error kinds to retry on; empty retries every error
    pub retry_on: Vec<ErrorKind>,
    /// Return the last error instead of `None` once attempts run out
    pub raise_last: bool,
    /// Expect `call_async` instead of `call`
    pub asynchronous: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: u64::try_from(DEFAULT_RETRY_DELAY.as_millis()).unwrap_or(u64::MAX),
            backoff: BackoffConfig::default(),
            retry_on: Vec::new(),
            raise_last: true,
            asynchronous: false,
        }
    }
}

impl RetryConfig {
    /// Create a retry config for quick local operations
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 50,
            ..Default::default()
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Filter built from `retry_on`
    pub fn filter(&self) -> ErrorFilter {
        if self.retry_on.is_empty() {
            ErrorFilter::All
        } else {
            ErrorFilter::Kinds(self.retry_on.clone())
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_in_bounds("max_attempts", self.max_attempts, Some(1), None, Bounds::Inclusive)?;
        ensure_no_duplicates("retry_on", &self.retry_on)?;
        self.backoff.validate()
    }
}

/// Configuration for [`RateLimiter`](super::RateLimiter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Calls allowed per period
    pub calls: u32,
    pub period_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls: 1,
            period_ms: u64::try_from(DEFAULT_RATE_LIMIT_INTERVAL.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl RateLimitConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_in_bounds("calls", self.calls, Some(1), None, Bounds::Inclusive)?;
        ensure_in_bounds("period_ms", self.period_ms, Some(0), None, Bounds::Exclusive)?;
        Ok(())
    }
}
