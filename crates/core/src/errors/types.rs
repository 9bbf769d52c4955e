//! Core error type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Result type alias for gizmos operations
pub type Result<T> = std::result::Result<T, Error>;

/// Shared, cloneable error source
pub type SharedSource = Arc<dyn std::error::Error + Send + Sync>;

/// Core error type for gizmos operations using thiserror
///
/// Errors are `Clone` so that a failure can be both recorded in a history
/// (see `CaughtError`) and handed back to the caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A parameter had an unacceptable value
    InvalidArgument { parameter: String, message: String },

    /// A parameter had an unexpected type
    TypeMismatch {
        parameter: String,
        expected: String,
        found: String,
    },

    /// A collection that must be unique contained duplicates
    Duplicate { what: String, message: String },

    /// A named error raised by user code or by a `DifferentError` handler
    Custom {
        name: String,
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    /// Operation timeout errors
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// A guarded call panicked
    Panicked { message: String },

    /// A component was started while already running
    Reactivation { component: String },

    /// A component was used before being started
    NotStarted { component: String },

    /// The host platform has no supported strategy
    UnsupportedPlatform { platform: String, message: String },

    /// A process-global resource is already held
    Busy { resource: String, message: String },

    /// A worker thread failed
    WorkerFailed {
        worker: String,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// File system operations
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Environment variable related errors
    Environment { variable: String, message: String },

    /// JSON serialization/deserialization errors
    Json {
        message: String,
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// Configuration errors
    Configuration { message: String },
}

/// Discriminant of [`Error`], used to watch for classes of failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    TypeMismatch,
    Duplicate,
    Custom,
    Timeout,
    Panicked,
    Reactivation,
    NotStarted,
    UnsupportedPlatform,
    Busy,
    WorkerFailed,
    FileSystem,
    Environment,
    Json,
    Configuration,
}

impl ErrorKind {
    /// Every kind, in declaration order
    pub const ALL: [ErrorKind; 15] = [
        ErrorKind::InvalidArgument,
        ErrorKind::TypeMismatch,
        ErrorKind::Duplicate,
        ErrorKind::Custom,
        ErrorKind::Timeout,
        ErrorKind::Panicked,
        ErrorKind::Reactivation,
        ErrorKind::NotStarted,
        ErrorKind::UnsupportedPlatform,
        ErrorKind::Busy,
        ErrorKind::WorkerFailed,
        ErrorKind::FileSystem,
        ErrorKind::Environment,
        ErrorKind::Json,
        ErrorKind::Configuration,
    ];

    /// Stable name of the kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::Duplicate => "Duplicate",
            ErrorKind::Custom => "Custom",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Panicked => "Panicked",
            ErrorKind::Reactivation => "Reactivation",
            ErrorKind::NotStarted => "NotStarted",
            ErrorKind::UnsupportedPlatform => "UnsupportedPlatform",
            ErrorKind::Busy => "Busy",
            ErrorKind::WorkerFailed => "WorkerFailed",
            ErrorKind::FileSystem => "FileSystem",
            ErrorKind::Environment => "Environment",
            ErrorKind::Json => "Json",
            ErrorKind::Configuration => "Configuration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// The kind of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::Duplicate { .. } => ErrorKind::Duplicate,
            Error::Custom { .. } => ErrorKind::Custom,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Panicked { .. } => ErrorKind::Panicked,
            Error::Reactivation { .. } => ErrorKind::Reactivation,
            Error::NotStarted { .. } => ErrorKind::NotStarted,
            Error::UnsupportedPlatform { .. } => ErrorKind::UnsupportedPlatform,
            Error::Busy { .. } => ErrorKind::Busy,
            Error::WorkerFailed { .. } => ErrorKind::WorkerFailed,
            Error::FileSystem { .. } => ErrorKind::FileSystem,
            Error::Environment { .. } => ErrorKind::Environment,
            Error::Json { .. } => ErrorKind::Json,
            Error::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// The user-visible "type" of this error
    ///
    /// Custom errors report their own name, everything else the kind name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Error::Custom { name, .. } => name,
            other => other.kind().as_str(),
        }
    }
}
