//! Extension traits for error handling

use super::types::{Error, Result};

/// Extension trait for adding context to Results
///
/// The kind of the underlying error is preserved so that error filters keep
/// matching after context has been attached.
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a lazy message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().prefixed(message.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().prefixed(f()))
    }
}

impl Error {
    /// Prefix the human readable message of this error with `context`
    #[must_use]
    pub fn prefixed(self, context: String) -> Self {
        match self {
            Error::InvalidArgument { parameter, message } => Error::InvalidArgument {
                parameter,
                message: format!("{context}: {message}"),
            },
            Error::Duplicate { what, message } => Error::Duplicate {
                what,
                message: format!("{context}: {message}"),
            },
            Error::Custom {
                name,
                message,
                source,
            } => Error::Custom {
                name,
                message: format!("{context}: {message}"),
                source,
            },
            Error::Environment { variable, message } => Error::Environment {
                variable,
                message: format!("{context}: {message}"),
            },
            Error::Json { message, source } => Error::Json {
                message: format!("{context}: {message}"),
                source,
            },
            Error::Configuration { message } => Error::Configuration {
                message: format!("{context}: {message}"),
            },
            Error::FileSystem {
                path,
                operation,
                source,
            } => Error::FileSystem {
                path,
                operation: format!("{context}: {operation}"),
                source,
            },
            other => other,
        }
    }
}
