//! Selection of the errors a guarded region watches for.

use super::types::{Error, ErrorKind, Result};
use crate::guards::{ensure_no_duplicates, ensure_not_empty};
use std::sync::Arc;

/// Which errors a failure manager, retry or filter should act on
#[derive(Clone, Default)]
pub enum ErrorFilter {
    /// Every error
    #[default]
    All,
    /// Errors of the listed kinds
    Kinds(Vec<ErrorKind>),
    /// Errors whose [`Error::name`] is listed
    Named(Vec<String>),
    /// Custom predicate
    Custom(Arc<dyn Fn(&Error) -> bool + Send + Sync>),
}

impl ErrorFilter {
    /// Watch a single kind
    #[must_use]
    pub fn kind(kind: ErrorKind) -> Self {
        ErrorFilter::Kinds(vec![kind])
    }

    /// Watch a single custom error name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        ErrorFilter::Named(vec![name.into()])
    }

    /// Watch errors accepted by `predicate`
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        ErrorFilter::Custom(Arc::new(predicate))
    }

    /// Whether `error` is watched
    #[must_use]
    pub fn matches(&self, error: &Error) -> bool {
        match self {
            ErrorFilter::All => true,
            ErrorFilter::Kinds(kinds) => kinds.contains(&error.kind()),
            ErrorFilter::Named(names) => names.iter().any(|n| n == error.name()),
            ErrorFilter::Custom(predicate) => predicate(error),
        }
    }

    /// Reject empty or duplicated watch lists
    pub fn validate(&self) -> Result<()> {
        match self {
            ErrorFilter::Kinds(kinds) => {
                ensure_not_empty("exceptions", kinds)?;
                ensure_no_duplicates("exceptions", kinds)
            }
            ErrorFilter::Named(names) => {
                ensure_not_empty("exceptions", names)?;
                if names.iter().any(|n| n.trim().is_empty()) {
                    return Err(Error::invalid_argument(
                        "exceptions",
                        "error names must not be blank",
                    ));
                }
                ensure_no_duplicates("exceptions", names)
            }
            ErrorFilter::All | ErrorFilter::Custom(_) => Ok(()),
        }
    }
}

impl std::fmt::Debug for ErrorFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorFilter::All => write!(f, "ErrorFilter::All"),
            ErrorFilter::Kinds(kinds) => write!(f, "ErrorFilter::Kinds({kinds:?})"),
            ErrorFilter::Named(names) => write!(f, "ErrorFilter::Named({names:?})"),
            ErrorFilter::Custom(_) => write!(f, "ErrorFilter::Custom(<predicate>)"),
        }
    }
}

impl From<ErrorKind> for ErrorFilter {
    fn from(kind: ErrorKind) -> Self {
        ErrorFilter::kind(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_matches_by_kind_and_name() {
        let timeout = Error::timeout("fetch", Duration::from_secs(1));
        let custom = Error::custom("ConnectionError", "refused");

        assert!(ErrorFilter::All.matches(&timeout));
        assert!(ErrorFilter::kind(ErrorKind::Timeout).matches(&timeout));
        assert!(!ErrorFilter::kind(ErrorKind::Timeout).matches(&custom));
        assert!(ErrorFilter::named("ConnectionError").matches(&custom));
        assert!(ErrorFilter::named("Timeout").matches(&timeout));
        assert!(ErrorFilter::custom(|e| e.to_string().contains("refused")).matches(&custom));
    }

    #[test]
    fn test_validate_rejects_empty_and_duplicates() {
        assert!(ErrorFilter::Kinds(vec![]).validate().is_err());
        assert!(ErrorFilter::Kinds(vec![ErrorKind::Json, ErrorKind::Json])
            .validate()
            .is_err());
        assert!(ErrorFilter::Named(vec![" ".to_string()]).validate().is_err());
        assert!(ErrorFilter::Kinds(vec![ErrorKind::Json, ErrorKind::Timeout])
            .validate()
            .is_ok());
    }
}
