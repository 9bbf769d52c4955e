//! Resilience patterns for calls that fail transiently.
//!
//! ## Key Components
//!
//! - [`retry`] - [`Retry`], calling a function again after watched failures,
//!   blocking or async
//! - [`backoff`] - [`BackoffStrategy`] and its serializable [`BackoffConfig`]
//! - [`rate_limit`] - [`RateLimiter`], spacing calls to a minimum interval
//! - [`config`] - [`RetryConfig`] and [`RateLimitConfig`]
//!
//! ## Examples
//!
//! ```rust,no_run
//! use gizmos_core::Error;
//! use gizmos_utils::resilience::{BackoffStrategy, Retry};
//! use std::time::Duration;
//!
//! # fn example() -> gizmos_core::Result<()> {
//! let mut retry = Retry::new(3, Duration::from_millis(100))?
//!     .with_backoff(BackoffStrategy::exponential(2.0)?);
//!
//! let value = retry.call(|| Ok::<_, Error>("connected"))?;
//! assert_eq!(value, Some("connected"));
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod config;
pub mod rate_limit;
pub mod retry;


pub use backoff::{BackoffConfig, BackoffKind, BackoffStrategy};
pub use config::{RateLimitConfig, RetryConfig};
pub use rate_limit::RateLimiter;
pub use retry::Retry;
