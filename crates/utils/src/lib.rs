//! Failure handling, retry, timeout and worker helpers for gizmos
//!
//! Everything here builds on the error model in `gizmos-core`: a call
//! either succeeds or yields an [`Error`](gizmos_core::Error), and the
//! helpers decide what happens next based on an
//! [`ErrorFilter`](gizmos_core::ErrorFilter).
//!
//! ## Key Components
//!
//! - **`failure`**: `FailureManager` and its prioritised handler chain.
//! - **`resilience`**: `Retry` with pluggable backoff, and `RateLimiter`.
//! - **`timeout`**: `Timeout` with signal and watcher-thread strategies.
//! - **`concurrency`**: `QueueProcessor`, `PeriodicTask` and `batch_process`.
//! - **`cache`**: `MemoCache`, a memoizing map with optional LRU bound.
//! - **`cleanup`**: RAII guards for temp files, env vars and the working directory.
//! - **`timer`**, **`registry`**, **`config`** and **`tracing`** round out the
//!   ambient pieces.

pub mod cache;
pub mod cleanup;
pub mod concurrency;
pub mod config;
pub mod failure;
pub mod registry;
pub mod resilience;
pub mod timeout;
pub mod timer;
pub mod tracing;

pub use cache::MemoCache;
pub use cleanup::{CurrentDirGuard, EnvVarGuard, ScopedCleanup, TempDirGuard, TempFileGuard};
pub use concurrency::{
    batch_process, FailurePolicy, PeriodicTask, QueueConfig, QueueHandle, QueueProcessor,
};
pub use config::Settings;
pub use failure::{
    CaughtError, DifferentError, FailureHandler, FailureManager, FailureManagerBuilder, Fallback,
    HandlerState, Suppress,
};
pub use registry::SingletonRegistry;
pub use resilience::{
    BackoffConfig, BackoffKind, BackoffStrategy, RateLimitConfig, RateLimiter, Retry, RetryConfig,
};
pub use timeout::{CancellableExecutor, Completion, Timeout, TimeoutConfig, TimeoutStrategy};
pub use timer::{benchmark, timed, BenchmarkReport, TimeUnit, Timer};
