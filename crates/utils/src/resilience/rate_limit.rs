//! Spacing calls out to a minimum interval.

use super::config::RateLimitConfig;
use gizmos_core::guards::{ensure_in_bounds, Bounds};
use gizmos_core::{Error, Result};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Enforces a minimum interval between consecutive calls
///
/// Each caller reserves the next free slot under the lock and then waits
/// for it outside the lock, so concurrent callers are spaced out in the
/// order they arrived.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Allow one call per `interval`
    pub fn new(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::invalid_argument("interval", "must be > 0"));
        }
        Ok(Self {
            interval,
            next_slot: Mutex::new(None),
        })
    }

    /// Allow `calls` calls per `period`, evenly spaced
    pub fn per_period(calls: u32, period: Duration) -> Result<Self> {
        ensure_in_bounds("calls", calls, Some(1), None, Bounds::Inclusive)?;
        Self::new(period / calls)
    }

    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        config.validate()?;
        Self::per_period(config.calls, config.period())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next slot, returning how long to wait for it
    fn reserve(&self) -> Duration {
        let now = Instant::now();
        let mut next_slot = self.next_slot.lock();
        let slot = match *next_slot {
            Some(slot) if slot > now => slot,
            _ => now,
        };
        *next_slot = Some(slot + self.interval);
        slot.saturating_duration_since(now)
    }

    /// Block until a call is allowed
    pub fn acquire(&self) {
        let wait = self.reserve();
        if !wait.is_zero() {
            tracing::trace!(wait = ?wait, "rate limited");
            std::thread::sleep(wait);
        }
    }

    /// Suspend until a call is allowed
    pub async fn acquire_async(&self) {
        let wait = self.reserve();
        if !wait.is_zero() {
            tracing::trace!(wait = ?wait, "rate limited");
            tokio::time::sleep(wait).await;
        }
    }

    /// Take a slot only if one is free right now
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut next_slot = self.next_slot.lock();
        match *next_slot {
            Some(slot) if slot > now => false,
            _ => {
                *next_slot = Some(now + self.interval);
                true
            }
        }
    }

    /// Decorate `f` so every call waits for its slot first
    pub fn wrap<'a, A, R, F>(&'a self, mut f: F) -> impl FnMut(A) -> R + 'a
    where
        F: FnMut(A) -> R + 'a,
    {
        move |arg| {
            self.acquire();
            f(arg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_interval() {
        assert!(RateLimiter::new(Duration::ZERO).is_err());
        assert!(RateLimiter::per_period(0, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_per_period_spacing() {
        let limiter = RateLimiter::per_period(4, Duration::from_secs(1)).unwrap();
        assert_eq!(limiter.interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_try_acquire_respects_interval() {
        let limiter = RateLimiter::new(Duration::from_secs(60)).unwrap();
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_acquire_spaces_calls() {
        let limiter = RateLimiter::new(Duration::from_millis(30)).unwrap();
        let start = Instant::now();
        let mut call = limiter.wrap(|x: u32| x * 2);

        assert_eq!(call(1), 2);
        assert_eq!(call(2), 4);
        assert_eq!(call(3), 6);

        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_acquire_async_waits() {
        let limiter = RateLimiter::new(Duration::from_millis(20)).unwrap();
        let start = Instant::now();
        limiter.acquire_async().await;
        limiter.acquire_async().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
