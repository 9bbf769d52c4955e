//! Backoff strategies deciding how a retry delay grows between attempts.

use gizmos_core::guards::{ensure_in_bounds, Bounds};
use gizmos_core::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type BackoffFn = dyn Fn(Duration, u32) -> Duration + Send + Sync;

/// Computes the next delay from the current delay and the attempt number
#[derive(Clone)]
pub struct BackoffStrategy {
    name: &'static str,
    func: Arc<BackoffFn>,
}

impl BackoffStrategy {
    /// Wrap an arbitrary `(delay, attempt) -> delay` function
    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(Duration, u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            name: "custom",
            func: Arc::new(func),
        }
    }

    /// Keep the delay unchanged
    #[must_use]
    pub fn constant() -> Self {
        Self {
            name: "constant",
            func: Arc::new(|delay, _| delay),
        }
    }

    /// Grow the delay by `step` on every retry
    #[must_use]
    pub fn linear(step: Duration) -> Self {
        Self {
            name: "linear",
            func: Arc::new(move |delay, _| delay.saturating_add(step)),
        }
    }

    /// Multiply the delay by `factor` on every retry
    pub fn exponential(factor: f64) -> Result<Self> {
        ensure_finite("factor", factor)?;
        ensure_in_bounds("factor", factor, Some(0.0), None, Bounds::Exclusive)?;
        Ok(Self {
            name: "exponential",
            func: Arc::new(move |delay, _| scale(delay, factor)),
        })
    }

    /// Never let `inner` exceed `max`
    #[must_use]
    pub fn capped(max: Duration, inner: BackoffStrategy) -> Self {
        Self {
            name: "capped",
            func: Arc::new(move |delay, attempt| inner.apply(delay, attempt).min(max)),
        }
    }

    /// Add up to `factor` times the delay of `inner` as random jitter
    pub fn jittered(factor: f64, inner: BackoffStrategy) -> Result<Self> {
        ensure_finite("jitter", factor)?;
        ensure_in_bounds("jitter", factor, Some(0.0), Some(1.0), Bounds::Inclusive)?;
        Ok(Self {
            name: "jittered",
            func: Arc::new(move |delay, attempt| {
                let base = inner.apply(delay, attempt);
                let spread = rand::thread_rng().gen_range(0.0..=factor);
                base.saturating_add(scale(base, spread))
            }),
        })
    }

    /// Next delay for `attempt`
    pub fn apply(&self, delay: Duration, attempt: u32) -> Duration {
        (self.func)(delay, attempt)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BackoffStrategy::{}", self.name)
    }
}

fn ensure_finite(parameter: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid_argument(parameter, format!("{value} is not finite")))
    }
}

fn scale(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

/// Shape of the delay growth in a [`BackoffConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// No backoff, the delay stays as configured
    #[default]
    None,
    Linear,
    Exponential,
}

/// Serializable description of a [`BackoffStrategy`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub kind: BackoffKind,
    /// Increment used by [`BackoffKind::Linear`]
    pub step_ms: u64,
    /// Multiplier used by [`BackoffKind::Exponential`]
    pub factor: f64,
    /// Upper bound on any computed delay
    pub max_delay_ms: Option<u64>,
    /// Random jitter as a fraction of the delay, between 0 and 1
    pub jitter: Option<f64>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            kind: BackoffKind::None,
            step_ms: 100,
            factor: 2.0,
            max_delay_ms: None,
            jitter: None,
        }
    }
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<()> {
        self.build().map(|_| ())
    }

    /// Build the strategy, or `None` when no backoff is configured
    pub fn build(&self) -> Result<Option<BackoffStrategy>> {
        let mut strategy = match self.kind {
            BackoffKind::None => return Ok(None),
            BackoffKind::Linear => BackoffStrategy::linear(Duration::from_millis(self.step_ms)),
            BackoffKind::Exponential => BackoffStrategy::exponential(self.factor)?,
        };
        // the cap bounds the jittered delay
        if let Some(jitter) = self.jitter {
            strategy = BackoffStrategy::jittered(jitter, strategy)?;
        }
        if let Some(max) = self.max_delay_ms {
            strategy = BackoffStrategy::capped(Duration::from_millis(max), strategy);
        }
        Ok(Some(strategy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gizmos_core::ErrorKind;
    use proptest::prelude::*;

    #[test]
    fn test_linear_and_exponential() {
        let linear = BackoffStrategy::linear(Duration::from_millis(50));
        assert_eq!(linear.apply(Duration::from_millis(100), 2), Duration::from_millis(150));

        let exponential = BackoffStrategy::exponential(2.0).unwrap();
        assert_eq!(exponential.apply(Duration::from_secs(1), 2), Duration::from_secs(2));
        assert_eq!(format!("{exponential:?}"), "BackoffStrategy::exponential");
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert_eq!(
            BackoffStrategy::exponential(0.0).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert!(BackoffStrategy::exponential(f64::INFINITY).is_err());
        assert!(BackoffStrategy::jittered(1.5, BackoffStrategy::constant()).is_err());
    }

    #[test]
    fn test_capped_limits_growth() {
        let capped = BackoffStrategy::capped(
            Duration::from_secs(3),
            BackoffStrategy::exponential(10.0).unwrap(),
        );
        assert_eq!(capped.apply(Duration::from_secs(1), 2), Duration::from_secs(3));
    }

    #[test]
    fn test_config_builds_strategy() {
        let config: BackoffConfig =
            serde_json::from_str(r#"{"kind": "exponential", "factor": 3.0, "max_delay_ms": 500}"#)
                .unwrap();
        let strategy = config.build().unwrap().unwrap();
        assert_eq!(strategy.apply(Duration::from_millis(100), 2), Duration::from_millis(300));
        assert_eq!(strategy.apply(Duration::from_millis(300), 3), Duration::from_millis(500));

        assert!(BackoffConfig::default().build().unwrap().is_none());

        let bad = BackoffConfig {
            kind: BackoffKind::Linear,
            jitter: Some(2.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    proptest! {
        #[test]
        fn jitter_stays_within_factor(ms in 0u64..10_000, factor in 0.0f64..=1.0) {
            let strategy = BackoffStrategy::jittered(factor, BackoffStrategy::constant()).unwrap();
            let delay = Duration::from_millis(ms);
            let next = strategy.apply(delay, 2);
            prop_assert!(next >= delay);
            prop_assert!(next.as_secs_f64() <= delay.as_secs_f64() * (1.0 + factor) + 1e-6);
        }

        #[test]
        fn capped_never_exceeds_max(ms in 0u64..100_000, max_ms in 0u64..10_000) {
            let max = Duration::from_millis(max_ms);
            let strategy = BackoffStrategy::capped(max, BackoffStrategy::exponential(2.0).unwrap());
            prop_assert!(strategy.apply(Duration::from_millis(ms), 3) <= max);
        }

        #[test]
        fn configured_cap_bounds_jittered_delay(
            ms in 1u64..10_000,
            max_ms in 1u64..5_000,
            jitter in 0.0f64..=1.0,
        ) {
            let config = BackoffConfig {
                kind: BackoffKind::Exponential,
                factor: 10.0,
                max_delay_ms: Some(max_ms),
                jitter: Some(jitter),
                ..Default::default()
            };
            let strategy = config.build().unwrap().unwrap();
            let next = strategy.apply(Duration::from_millis(ms), 2);
            prop_assert!(next <= Duration::from_millis(max_ms));
        }
    }
}
