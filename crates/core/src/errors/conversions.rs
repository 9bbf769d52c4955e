//! Conversion implementations for error types

use super::types::Error;
use std::path::PathBuf;
use std::sync::Arc;

// Conversion implementations (keeping these as they provide more context than thiserror's #[from])
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: Arc::new(error),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: Arc::new(error),
        }
    }
}

/// `anyhow` errors become named custom errors so they can be watched for by name
impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Custom {
            name: "anyhow::Error".to_string(),
            message: format!("{error:#}"),
            source: None,
        }
    }
}
