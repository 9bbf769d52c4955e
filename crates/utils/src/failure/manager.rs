//! Scoped failure boundary dispatching to a priority-ordered handler chain.

use super::handler::FailureHandler;
use super::record::CaughtError;
use futures::FutureExt;
use gizmos_core::guards::ensure_no_duplicates;
use gizmos_core::{Error, ErrorFilter, Result};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

const PRIORITIES: &str = "FailureManager handler priorities";

/// Catches watched errors escaping a guarded region and runs handlers on them
///
/// Handlers run in ascending priority order. Watched errors are recorded in
/// [`caught`](Self::caught) and swallowed unless a handler fails, in which
/// case the handler's error is returned instead. A handler that panics is
/// treated as failing with [`Panicked`](gizmos_core::ErrorKind::Panicked); the
/// caught record is kept either way. Unwatched errors (and unwatched panics)
/// pass through untouched.
///
/// A manager is meant for sequential reuse; it has no internal locking and
/// every mutating operation takes `&mut self`.
pub struct FailureManager {
    handlers: Vec<Box<dyn FailureHandler>>,
    watched: ErrorFilter,
    caught: Vec<CaughtError>,
}

/// Builder for [`FailureManager`]
#[derive(Default)]
pub struct FailureManagerBuilder {
    handlers: Vec<Box<dyn FailureHandler>>,
    watched: ErrorFilter,
    assign_priorities: bool,
}

impl FailureManagerBuilder {
    /// Append a handler
    #[must_use]
    pub fn handler<H: FailureHandler>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Append already boxed handlers
    #[must_use]
    pub fn handlers(mut self, handlers: impl IntoIterator<Item = Box<dyn FailureHandler>>) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Errors to act on, defaults to every error
    #[must_use]
    pub fn watch(mut self, watched: impl Into<ErrorFilter>) -> Self {
        self.watched = watched.into();
        self
    }

    /// Bump clashing priorities to the next free slot instead of failing
    #[must_use]
    pub fn assign_priorities(mut self, assign: bool) -> Self {
        self.assign_priorities = assign;
        self
    }

    pub fn build(self) -> Result<FailureManager> {
        self.watched.validate()?;

        let mut handlers = self.handlers;
        if self.assign_priorities {
            let mut taken = HashSet::with_capacity(handlers.len());
            for handler in &mut handlers {
                let mut priority = handler.priority();
                while taken.contains(&priority) {
                    priority = priority.checked_add(1).ok_or_else(|| {
                        Error::invalid_argument(
                            "priority",
                            format!("no free priority above {} for {handler}", handler.priority()),
                        )
                    })?;
                }
                handler.set_priority(priority)?;
                taken.insert(priority);
            }
        }

        let mut manager = FailureManager {
            handlers,
            watched: self.watched,
            caught: Vec::new(),
        };
        manager.sort_handlers()?;

        tracing::debug!(
            handlers = manager.handlers.len(),
            watched = ?manager.watched,
            "created failure manager"
        );
        Ok(manager)
    }
}

impl FailureManager {
    #[must_use]
    pub fn builder() -> FailureManagerBuilder {
        FailureManagerBuilder::default()
    }

    /// Create a manager from boxed handlers, failing on duplicate priorities
    pub fn new(handlers: Vec<Box<dyn FailureHandler>>, watched: ErrorFilter) -> Result<Self> {
        Self::builder().handlers(handlers).watch(watched).build()
    }

    /// Run `f` inside the failure boundary
    ///
    /// Returns `Ok(Some(value))` on success and `Ok(None)` when a watched
    /// error was handled. Panics are caught and treated as
    /// [`Error::Panicked`]; unwatched panics resume unwinding.
    pub fn run<T, E, F>(&mut self, f: F) -> Result<Option<T>>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: Into<Error>,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(f));
        self.settle(outcome)
    }

    /// Run a future inside the failure boundary, see [`run`](Self::run)
    pub async fn run_async<T, E, Fut>(&mut self, fut: Fut) -> Result<Option<T>>
    where
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<Error>,
    {
        let outcome = AssertUnwindSafe(fut).catch_unwind().await;
        self.settle(outcome)
    }

    /// Decorate `f` so that every call runs inside the failure boundary
    pub fn wrap<'a, A, T, E, F>(&'a mut self, mut f: F) -> impl FnMut(A) -> Result<Option<T>> + 'a
    where
        F: FnMut(A) -> std::result::Result<T, E> + 'a,
        E: Into<Error>,
        A: 'a,
        T: 'a,
    {
        move |arg| self.run(|| f(arg))
    }

    fn settle<T, E>(&mut self, outcome: std::thread::Result<std::result::Result<T, E>>) -> Result<Option<T>>
    where
        E: Into<Error>,
    {
        let error = match outcome {
            Ok(Ok(value)) => return Ok(Some(value)),
            Ok(Err(error)) => error.into(),
            Err(payload) => {
                let error = Error::from_panic(&*payload);
                if !self.watched.matches(&error) {
                    panic::resume_unwind(payload);
                }
                error
            }
        };

        if !self.watched.matches(&error) {
            return Err(error);
        }

        self.dispatch(error)?;
        Ok(None)
    }

    fn dispatch(&mut self, error: Error) -> Result<()> {
        let caught = CaughtError::new(error);
        tracing::warn!(
            error = %caught.error(),
            kind = %caught.kind(),
            "caught watched failure"
        );

        let mut outcome = Ok(());
        for handler in self.handlers.iter_mut().filter(|h| h.activated()) {
            let handled = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&caught)))
                .unwrap_or_else(|payload| Err(Error::from_panic(&*payload)));
            if let Err(error) = handled {
                tracing::debug!(handler = %handler, error = %error, "failure handler raised");
                outcome = Err(error);
                break;
            }
        }

        self.caught.push(caught);
        outcome
    }

    fn sort_handlers(&mut self) -> Result<()> {
        self.handlers.sort_by_key(|h| h.priority());
        ensure_no_duplicates(PRIORITIES, &self.priorities())
    }

    /// Renumber priorities to 1..=n, keeping the current order
    pub fn sort_handler_priorities(&mut self) -> Result<()> {
        for (index, handler) in self.handlers.iter_mut().enumerate() {
            let priority = u32::try_from(index + 1)
                .map_err(|_| Error::invalid_argument("priority", "too many handlers"))?;
            handler.set_priority(priority)?;
        }
        Ok(())
    }

    /// Set the priority of the handler currently at `current`
    pub fn set_priority(&mut self, current: u32, priority: u32) -> Result<()> {
        let index = self.position(current)?;
        if priority != current && self.priorities().contains(&priority) {
            let mut clashing = self.priorities();
            clashing.push(priority);
            return ensure_no_duplicates(PRIORITIES, &clashing);
        }
        self.handlers[index].set_priority(priority)?;
        self.sort_handlers()
    }

    /// Add a handler, failing if its priority is already taken
    pub fn add_handler<H: FailureHandler>(&mut self, handler: H) -> Result<()> {
        self.add_boxed_handler(Box::new(handler))
    }

    pub fn add_boxed_handler(&mut self, handler: Box<dyn FailureHandler>) -> Result<()> {
        let mut priorities = self.priorities();
        priorities.push(handler.priority());
        ensure_no_duplicates(PRIORITIES, &priorities)?;

        self.handlers.push(handler);
        self.sort_handlers()
    }

    /// Remove and return the handler with the given priority
    pub fn del_handler(&mut self, priority: u32) -> Result<Box<dyn FailureHandler>> {
        let index = self.position(priority)?;
        Ok(self.handlers.remove(index))
    }

    fn position(&self, priority: u32) -> Result<usize> {
        self.handlers
            .iter()
            .position(|h| h.priority() == priority)
            .ok_or_else(|| {
                Error::invalid_argument(
                    "priority",
                    format!("no handler with priority {priority} in the FailureManager"),
                )
            })
    }

    /// Handlers in execution order
    pub fn handlers(&self) -> impl Iterator<Item = &dyn FailureHandler> + '_ {
        self.handlers.iter().map(|h| h.as_ref())
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Priorities in execution order
    pub fn priorities(&self) -> Vec<u32> {
        self.handlers.iter().map(|h| h.priority()).collect()
    }

    /// Typed access to the handler at `priority`
    pub fn handler<H: FailureHandler>(&self, priority: u32) -> Option<&H> {
        self.handlers
            .iter()
            .find(|h| h.priority() == priority)
            .and_then(|h| h.as_any().downcast_ref::<H>())
    }

    pub fn handler_mut<H: FailureHandler>(&mut self, priority: u32) -> Option<&mut H> {
        self.handlers
            .iter_mut()
            .find(|h| h.priority() == priority)
            .and_then(|h| h.as_any_mut().downcast_mut::<H>())
    }

    pub fn watched(&self) -> &ErrorFilter {
        &self.watched
    }

    pub fn set_watched(&mut self, watched: impl Into<ErrorFilter>) -> Result<()> {
        let watched = watched.into();
        watched.validate()?;
        self.watched = watched;
        Ok(())
    }

    /// Caught failures in chronological order
    pub fn caught(&self) -> &[CaughtError] {
        &self.caught
    }

    pub fn clear_caught(&mut self) {
        self.caught.clear();
    }
}

impl fmt::Debug for FailureManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: Vec<String> = self.handlers.iter().map(|h| h.to_string()).collect();
        f.debug_struct("FailureManager")
            .field("handlers", &handlers)
            .field("watched", &self.watched)
            .field("caught", &self.caught.len())
            .finish()
    }
}
