//! RAII guards that undo a change when they go out of scope, including
//! while unwinding from a panic.
//!
//! - [`temp`] - temporary files and directories
//! - [`env`] - environment variables and the current directory
//! - [`scoped`] - any closure

pub mod env;
pub mod scoped;
pub mod temp;

pub use env::{CurrentDirGuard, EnvVarGuard};
pub use scoped::ScopedCleanup;
pub use temp::{TempDirGuard, TempFileGuard};
