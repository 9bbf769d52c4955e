//! Layered settings for the helpers in this crate.
//!
//! Settings start from defaults, may be read from a JSON document, and are
//! then overlaid with `GIZMOS_*` environment variables.

use crate::concurrency::QueueConfig;
use crate::resilience::{RateLimitConfig, RetryConfig};
use crate::timeout::TimeoutConfig;
use gizmos_core::constants::{
    DEFAULT_LOG_FILTER, GIZMOS_LOG_VAR, GIZMOS_QUEUE_WORKERS_VAR, GIZMOS_RETRY_DELAY_MS_VAR,
    GIZMOS_RETRY_MAX_ATTEMPTS_VAR, GIZMOS_TIMEOUT_MS_VAR,
};
use gizmos_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Settings for every configurable helper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `tracing` filter directives
    pub log_filter: String,
    pub retry: RetryConfig,
    pub timeout: TimeoutConfig,
    pub queue: QueueConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            retry: RetryConfig::default(),
            timeout: TimeoutConfig::default(),
            queue: QueueConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read settings", e))?;
        let settings = Self::from_json_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Defaults overlaid with the `GIZMOS_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();
        settings.apply_env()?;
        Ok(settings)
    }

    /// Overlay values from the `GIZMOS_*` environment variables that are set
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(filter) = std::env::var(GIZMOS_LOG_VAR) {
            self.log_filter = filter;
        }
        if let Some(attempts) = env_value(GIZMOS_RETRY_MAX_ATTEMPTS_VAR)? {
            self.retry.max_attempts = attempts;
        }
        if let Some(delay) = env_value(GIZMOS_RETRY_DELAY_MS_VAR)? {
            self.retry.delay_ms = delay;
        }
        if let Some(cutoff) = env_value(GIZMOS_TIMEOUT_MS_VAR)? {
            self.timeout.cutoff_ms = cutoff;
        }
        if let Some(workers) = env_value(GIZMOS_QUEUE_WORKERS_VAR)? {
            self.queue.workers = workers;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_filter.trim().is_empty() {
            return Err(Error::invalid_argument("log_filter", "must not be empty"));
        }
        self.retry.validate()?;
        self.timeout.validate()?;
        self.queue.validate()?;
        self.rate_limit.validate()
    }
}

fn env_value<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::environment(name, format!("invalid value '{raw}': {e}"))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::environment(name, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::EnvVarGuard;
    use crate::concurrency::FailurePolicy;
    use gizmos_core::ErrorKind;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json_str(
            r#"{"queue": {"workers": 2, "failure_policy": "fatal"}, "retry": {"delay_ms": 0}}"#,
        )
        .unwrap();
        assert_eq!(settings.queue.workers, 2);
        assert_eq!(settings.queue.failure_policy, FailurePolicy::Fatal);
        assert_eq!(settings.retry.delay_ms, 0);
        assert_eq!(settings.retry.max_attempts, RetryConfig::default().max_attempts);
        assert_eq!(settings.timeout, TimeoutConfig::default());
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let err = Settings::from_json_str(r#"{"queue": {"workers": 0}}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = Settings::from_json_str("{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Json);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"log_filter": "debug"}}"#).unwrap();
        assert_eq!(Settings::from_path(file.path()).unwrap().log_filter, "debug");

        let err = Settings::from_path(file.path().with_extension("missing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileSystem);
    }

    #[test]
    #[serial(env)]
    fn test_env_overlay() {
        let _env = EnvVarGuard::set([
            (GIZMOS_RETRY_MAX_ATTEMPTS_VAR, "7"),
            (GIZMOS_TIMEOUT_MS_VAR, "1500"),
            (GIZMOS_QUEUE_WORKERS_VAR, " 3 "),
            (GIZMOS_LOG_VAR, "gizmos=trace"),
        ])
        .unwrap();

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.retry.max_attempts, 7);
        assert_eq!(settings.timeout.cutoff_ms, 1500);
        assert_eq!(settings.queue.workers, 3);
        assert_eq!(settings.log_filter, "gizmos=trace");
    }

    #[test]
    #[serial(env)]
    fn test_env_overlay_rejects_garbage() {
        let _env = EnvVarGuard::set([(GIZMOS_QUEUE_WORKERS_VAR, "many")]).unwrap();
        let err = Settings::from_env().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Environment);
        assert!(err.to_string().contains(GIZMOS_QUEUE_WORKERS_VAR));
    }
}
