//! Failure handling, retry, timeout and worker-pool helpers
//!
//! This crate re-exports the workspace members under one name:
//!
//! - `gizmos-core` holds the `Error` model, `ErrorFilter` and the guard
//!   functions every constructor validates with.
//! - `gizmos-utils` holds the helpers: `FailureManager`, `Retry`,
//!   `Timeout`, `QueueProcessor` and friends.
//!
//! ```rust,no_run
//! use gizmos::{Error, ErrorKind, Retry};
//! use std::time::Duration;
//!
//! # fn example() -> gizmos::Result<()> {
//! let mut retry = Retry::new(3, Duration::from_millis(50))?.with_filter(ErrorKind::Custom)?;
//! let value = retry.call(|| Err::<u8, _>(Error::custom("Flaky", "try again")));
//! assert!(value.is_err());
//! # Ok(())
//! # }
//! ```

pub use gizmos_core::{constants, errors, guards};
pub use gizmos_core::{Bounds, Error, ErrorFilter, ErrorKind, Result, ResultExt};

pub use gizmos_utils::*;
