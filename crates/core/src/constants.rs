/// Constants used throughout the gizmos codebase
use std::time::Duration;

// Environment variable names
pub const GIZMOS_LOG_VAR: &str = "GIZMOS_LOG";
pub const GIZMOS_RETRY_MAX_ATTEMPTS_VAR: &str = "GIZMOS_RETRY_MAX_ATTEMPTS";
pub const GIZMOS_RETRY_DELAY_MS_VAR: &str = "GIZMOS_RETRY_DELAY_MS";
pub const GIZMOS_TIMEOUT_MS_VAR: &str = "GIZMOS_TIMEOUT_MS";
pub const GIZMOS_QUEUE_WORKERS_VAR: &str = "GIZMOS_QUEUE_WORKERS";

// Logging
pub const DEFAULT_LOG_FILTER: &str = "info";

// Failure handlers
pub const DEFAULT_HANDLER_PRIORITY: u32 = 1;
pub const DEFAULT_DIFFERENT_ERROR_FORMAT: &str = "{value}";

// Retry
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

// Timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// Queue processing
pub const DEFAULT_QUEUE_WORKERS: usize = 4;
pub const DEFAULT_QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Rate limiting
pub const DEFAULT_RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(1);
