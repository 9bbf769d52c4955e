//! Record of a failure caught inside a guarded region.

use chrono::{DateTime, Local};
use gizmos_core::{Error, ErrorKind, Result};
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;

/// A caught error together with where and when it was caught
///
/// The backtrace is captured at the catch site and is only populated when
/// `RUST_BACKTRACE` (or `RUST_LIB_BACKTRACE`) enables capturing.
#[derive(Debug, Clone)]
pub struct CaughtError {
    error: Error,
    backtrace: Arc<Backtrace>,
    time: DateTime<Local>,
}

impl CaughtError {
    /// Record `error` as caught now
    #[must_use]
    pub fn new(error: Error) -> Self {
        Self {
            error,
            backtrace: Arc::new(Backtrace::capture()),
            time: Local::now(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Name of the error, see [`Error::name`]
    pub fn name(&self) -> &str {
        self.error.name()
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn time(&self) -> DateTime<Local> {
        self.time
    }

    /// Return the caught error again
    pub fn reraise(&self) -> Result<()> {
        Err(self.error.clone())
    }

    pub fn into_error(self) -> Error {
        self.error
    }
}

impl fmt::Display for CaughtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CaughtError({}, time {})",
            self.error,
            self.time.format("%Y-%m-%d %H:%M:%S%.6f")
        )
    }
}
