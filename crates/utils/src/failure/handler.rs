//! Failure handlers invoked by a [`FailureManager`](super::FailureManager).

use super::record::CaughtError;
use gizmos_core::guards::{ensure_in_bounds, Bounds};
use gizmos_core::{
    Error, Result, SharedSource, DEFAULT_DIFFERENT_ERROR_FORMAT, DEFAULT_HANDLER_PRIORITY,
};
use std::any::{type_name, Any};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Activation flag and priority shared by every handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerState {
    priority: u32,
    activated: bool,
}

impl HandlerState {
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Lower numbers run first; the minimum is 1
    pub fn set_priority(&mut self, priority: u32) -> Result<()> {
        ensure_in_bounds("priority", priority, Some(1), None, Bounds::Inclusive)?;
        self.priority = priority;
        Ok(())
    }

    pub fn activated(&self) -> bool {
        self.activated
    }

    pub fn set_activated(&mut self, activated: bool) {
        self.activated = activated;
    }
}

impl Default for HandlerState {
    fn default() -> Self {
        Self {
            priority: DEFAULT_HANDLER_PRIORITY,
            activated: true,
        }
    }
}

/// A strategy run when a watched error escapes a guarded region
///
/// Returning `Err` from [`handle`](Self::handle) means the handler itself
/// failed; the manager stops running handlers and surfaces that error.
pub trait FailureHandler: Send + fmt::Display + 'static {
    fn state(&self) -> &HandlerState;

    fn state_mut(&mut self) -> &mut HandlerState;

    /// React to a caught error
    fn handle(&mut self, caught: &CaughtError) -> Result<()>;

    /// Value produced by the most recent invocation, if any
    fn returned_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn priority(&self) -> u32 {
        self.state().priority()
    }

    fn set_priority(&mut self, priority: u32) -> Result<()> {
        self.state_mut().set_priority(priority)
    }

    fn activated(&self) -> bool {
        self.state().activated()
    }

    fn set_activated(&mut self, activated: bool) {
        self.state_mut().set_activated(activated);
    }

    /// Builder form of [`set_priority`](Self::set_priority)
    fn with_priority(mut self, priority: u32) -> Result<Self>
    where
        Self: Sized,
    {
        self.set_priority(priority)?;
        Ok(self)
    }
}

/// Swallows the error and does nothing else
#[derive(Debug, Default)]
pub struct Suppress {
    state: HandlerState,
}

impl Suppress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FailureHandler for Suppress {
    fn state(&self) -> &HandlerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut HandlerState {
        &mut self.state
    }

    fn handle(&mut self, caught: &CaughtError) -> Result<()> {
        tracing::debug!(error = %caught.error(), "suppressing failure");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Display for Suppress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Suppress()")
    }
}

type FallbackFn<T> = Box<dyn FnMut() -> Result<T> + Send>;

/// Falls back to a stored closure when the guarded code fails
///
/// Arguments for the fallback are captured by the closure.
pub struct Fallback<T> {
    name: String,
    func: FallbackFn<T>,
    returned: Option<T>,
    state: HandlerState,
}

impl<T: Send + 'static> Fallback<T> {
    pub fn new<F, E>(func: F) -> Self
    where
        F: FnMut() -> std::result::Result<T, E> + Send + 'static,
        E: Into<Error>,
    {
        Self::named(type_name::<F>(), func)
    }

    /// Create a fallback with a readable name used in logs and `Display`
    pub fn named<F, E>(name: impl Into<String>, mut func: F) -> Self
    where
        F: FnMut() -> std::result::Result<T, E> + Send + 'static,
        E: Into<Error>,
    {
        Self {
            name: name.into(),
            func: Box::new(move || func().map_err(Into::into)),
            returned: None,
            state: HandlerState::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value returned by the last fallback run
    pub fn returned(&self) -> Option<&T> {
        self.returned.as_ref()
    }

    pub fn take_returned(&mut self) -> Option<T> {
        self.returned.take()
    }

    /// Run the fallback once and report whether it succeeded
    ///
    /// If the fallback is non-deterministic the answer cannot be trusted.
    pub fn validate(&mut self) -> bool {
        self.error_scan().is_none()
    }

    /// Run the fallback once and return the error it produced, if any
    pub fn error_scan(&mut self) -> Option<Error> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.func)())) {
            Ok(Ok(_)) => None,
            Ok(Err(error)) => Some(error),
            Err(payload) => Some(Error::from_panic(&*payload)),
        }
    }
}

impl<T: Send + 'static> FailureHandler for Fallback<T> {
    fn state(&self) -> &HandlerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut HandlerState {
        &mut self.state
    }

    fn handle(&mut self, caught: &CaughtError) -> Result<()> {
        tracing::debug!(fallback = %self.name, error = %caught.error(), "running fallback");
        self.returned = Some((self.func)()?);
        Ok(())
    }

    fn returned_any(&self) -> Option<&dyn Any> {
        self.returned.as_ref().map(|value| value as &dyn Any)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T> fmt::Display for Fallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fallback({})", self.name)
    }
}

/// Replaces the caught error with a differently named one
///
/// The message template supports `{kind}`, `{name}`, `{value}` and
/// `{backtrace}`.
#[derive(Debug, Clone)]
pub struct DifferentError {
    name: String,
    fmt: String,
    state: HandlerState,
}

impl DifferentError {
    pub fn new(name: impl Into<String>, fmt: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::invalid_argument("exc", "error name must not be blank"));
        }
        Ok(Self {
            name,
            fmt: fmt.into(),
            state: HandlerState::default(),
        })
    }

    /// Raise `name` with the caught error's message
    pub fn named(name: impl Into<String>) -> Result<Self> {
        Self::new(name, DEFAULT_DIFFERENT_ERROR_FORMAT)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> &str {
        &self.fmt
    }

    fn render(&self, caught: &CaughtError) -> String {
        self.fmt
            .replace("{kind}", caught.kind().as_str())
            .replace("{name}", caught.name())
            .replace("{value}", &caught.message())
            .replace("{backtrace}", &caught.backtrace().to_string())
    }
}

impl FailureHandler for DifferentError {
    fn state(&self) -> &HandlerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut HandlerState {
        &mut self.state
    }

    fn handle(&mut self, caught: &CaughtError) -> Result<()> {
        let message = self.render(caught);
        let source: SharedSource = Arc::new(caught.error().clone());
        tracing::debug!(from = %caught.name(), to = %self.name, "replacing error");
        Err(Error::Custom {
            name: self.name.clone(),
            message,
            source: Some(source),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Display for DifferentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DifferentError(name={}, fmt={})", self.name, self.fmt)
    }
}
