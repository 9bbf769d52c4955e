//! Failure handling for guarded regions of code
//!
//! A [`FailureManager`] watches a block (or a wrapped function) for errors
//! selected by an [`ErrorFilter`](gizmos_core::ErrorFilter) and hands each
//! caught error to a chain of [`FailureHandler`]s in ascending priority.
//!
//! - [`handler`] - the handler capability and the built-in `Suppress`,
//!   `Fallback` and `DifferentError` handlers
//! - [`record`] - the [`CaughtError`] record kept for every caught failure
//! - [`manager`] - the manager and its builder
//!
//! ```rust,no_run
//! use gizmos_core::{Error, ErrorKind};
//! use gizmos_utils::failure::{Fallback, FailureManager};
//!
//! # fn example() -> gizmos_core::Result<()> {
//! let mut manager = FailureManager::builder()
//!     .handler(Fallback::named("defaults", || Ok::<_, Error>(0)))
//!     .watch(ErrorKind::Custom)
//!     .build()?;
//!
//! let value = manager.run(|| Err::<i32, _>(Error::custom("ParseError", "bad digit")))?;
//! assert!(value.is_none());
//! assert_eq!(manager.caught().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod handler;
pub mod manager;
pub mod record;


pub use handler::{DifferentError, FailureHandler, Fallback, HandlerState, Suppress};
pub use manager::{FailureManager, FailureManagerBuilder};
pub use record::CaughtError;
