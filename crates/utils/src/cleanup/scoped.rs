//! Running an arbitrary closure when a scope ends.

/// Runs a closure on drop unless cancelled
pub struct ScopedCleanup<F: FnOnce()> {
    cleanup_fn: Option<F>,
}

impl<F: FnOnce()> ScopedCleanup<F> {
    pub fn new(cleanup_fn: F) -> Self {
        Self {
            cleanup_fn: Some(cleanup_fn),
        }
    }

    /// Drop the guard without running the closure
    pub fn cancel(mut self) {
        self.cleanup_fn = None;
    }
}

impl<F: FnOnce()> Drop for ScopedCleanup<F> {
    fn drop(&mut self) {
        if let Some(cleanup_fn) = self.cleanup_fn.take() {
            cleanup_fn();
        }
    }
}
