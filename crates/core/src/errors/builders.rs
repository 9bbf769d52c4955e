//! Builder methods for creating errors with context

use super::types::{Error, SharedSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// Helper methods for creating errors with context
impl Error {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a type mismatch error
    #[must_use]
    pub fn type_mismatch(
        parameter: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Error::TypeMismatch {
            parameter: parameter.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a duplicate items error
    #[must_use]
    pub fn duplicate(what: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Duplicate {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Create a named custom error
    #[must_use]
    pub fn custom(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Custom {
            name: name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a named custom error with a source error
    #[must_use]
    pub fn custom_with_source(
        name: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let source: SharedSource = Arc::from(source.into());
        Error::Custom {
            name: name.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an error for a panic caught in a guarded call
    #[must_use]
    pub fn panicked(message: impl Into<String>) -> Self {
        Error::Panicked {
            message: message.into(),
        }
    }

    /// Create an error from a panic payload
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Error::Panicked { message }
    }

    /// Create a reactivation error
    #[must_use]
    pub fn reactivation(component: impl Into<String>) -> Self {
        Error::Reactivation {
            component: component.into(),
        }
    }

    /// Create a not started error
    #[must_use]
    pub fn not_started(component: impl Into<String>) -> Self {
        Error::NotStarted {
            component: component.into(),
        }
    }

    /// Create an unsupported platform error
    #[must_use]
    pub fn unsupported_platform(platform: impl Into<String>, message: impl Into<String>) -> Self {
        Error::UnsupportedPlatform {
            platform: platform.into(),
            message: message.into(),
        }
    }

    /// Create a busy resource error
    #[must_use]
    pub fn busy(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Busy {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a worker failure error
    #[must_use]
    pub fn worker_failed(worker: impl Into<String>, message: impl Into<String>) -> Self {
        Error::WorkerFailed {
            worker: worker.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a worker failure error wrapping the error the worker produced
    #[must_use]
    pub fn worker_failed_with_source(worker: impl Into<String>, source: Error) -> Self {
        Error::WorkerFailed {
            worker: worker.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a file system error
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source: Arc::new(source),
        }
    }

    /// Create an environment variable error
    #[must_use]
    pub fn environment(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Environment {
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }
}
