//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument { parameter, message } => {
                write!(f, "invalid value for '{parameter}': {message}")
            }
            Error::TypeMismatch {
                parameter,
                expected,
                found,
            } => {
                write!(f, "'{parameter}' must be '{expected}', not '{found}'")
            }
            Error::Duplicate { what, message } => {
                write!(f, "{what} contain duplicate items: {message}")
            }
            Error::Custom { name, message, .. } => {
                if message.is_empty() {
                    write!(f, "{name}")
                } else {
                    write!(f, "{name}: {message}")
                }
            }
            Error::Timeout {
                operation,
                duration,
            } => {
                write!(f, "operation '{operation}' timed out after {duration:?}")
            }
            Error::Panicked { message } => {
                write!(f, "guarded call panicked: {message}")
            }
            Error::Reactivation { component } => {
                write!(f, "{component} is already running and cannot be started again")
            }
            Error::NotStarted { component } => {
                write!(f, "{component} has not been started")
            }
            Error::UnsupportedPlatform { platform, message } => {
                write!(f, "unsupported platform '{platform}': {message}")
            }
            Error::Busy { resource, message } => {
                write!(f, "{resource} is busy: {message}")
            }
            Error::WorkerFailed {
                worker, message, ..
            } => {
                write!(f, "worker '{worker}' failed: {message}")
            }
            Error::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "file system {} operation failed for '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            Error::Environment { variable, message } => {
                write!(f, "environment variable '{variable}' error: {message}")
            }
            Error::Json { message, .. } => {
                write!(f, "JSON error: {message}")
            }
            Error::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
        }
    }
}
