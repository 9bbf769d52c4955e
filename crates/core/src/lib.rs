//! Core error types, error filters and guard functions for `gizmos`.
//!
//! This crate holds the foundation the helpers in `gizmos-utils` build on.
//!
//! ## Key Components
//!
//! - **`errors`**: Defines the crate-wide `Error` enum, its `ErrorKind`
//!   discriminant, the `Result` alias and `ErrorFilter`, which selects the
//!   errors a guarded region watches for.
//! - **`guards`**: Precondition checks with boolean (`is_*`) and
//!   error-raising (`ensure_*`) variants, used by every constructor and setter.
//! - **`constants`**: Shared defaults and environment variable names.

pub mod constants;
pub mod errors;
pub mod guards;

pub use self::{
    constants::*,
    errors::{Error, ErrorFilter, ErrorKind, Result, ResultExt, SharedSource},
    guards::Bounds,
};
