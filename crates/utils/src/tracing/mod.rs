use gizmos_core::constants::{DEFAULT_LOG_FILTER, GIZMOS_LOG_VAR};
use gizmos_core::{Error, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// The filter comes from `GIZMOS_LOG`, then `RUST_LOG`, then defaults to
/// `info`. Events are written to stderr in the compact format, with colours
/// only when stderr is a terminal.
pub fn init() -> Result<()> {
    let directives = std::env::var(GIZMOS_LOG_VAR)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    init_with_filter(&directives)
}

/// Initialize the tracing system with explicit filter directives
pub fn init_with_filter(directives: &str) -> Result<()> {
    let filter = build_filter(directives)?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::configuration(format!("failed to install tracing subscriber: {e}")))
}

fn build_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|e| {
        Error::invalid_argument("log_filter", format!("invalid filter '{directives}': {e}"))
    })
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Create a span wrapping one guarded operation
pub fn operation_span(kind: &'static str, operation: &str) -> Span {
    span!(Level::DEBUG, "operation", kind = kind, operation = %operation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("gizmos_utils=debug,warn").is_ok());

        let err = build_filter("gizmos=[[[").unwrap_err();
        assert_eq!(err.kind(), gizmos_core::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_second_init_fails() {
        // the first call may lose to another test installing a subscriber
        let _ = init_with_filter("warn");
        let err = init_with_filter("warn").unwrap_err();
        assert_eq!(err.kind(), gizmos_core::ErrorKind::Configuration);
    }
}
