//! Processing a batch of items on a scoped thread pool.

use crossbeam::channel;
use gizmos_core::guards::{ensure_in_bounds, Bounds};
use gizmos_core::{Error, Result};
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Apply `func` to every item on up to `workers` threads
///
/// Results keep the order of `items`. An item whose call fails (or panics)
/// yields `None` and the failure is logged.
pub fn batch_process<T, R, E, F>(items: Vec<T>, workers: usize, func: F) -> Result<Vec<Option<R>>>
where
    T: Send,
    R: Send,
    E: Into<Error>,
    F: Fn(T) -> std::result::Result<R, E> + Sync,
{
    ensure_in_bounds("workers", workers, Some(1), None, Bounds::Inclusive)?;

    let total = items.len();
    let (work_tx, work_rx) = channel::unbounded();
    for entry in items.into_iter().enumerate() {
        // the receiver is alive until the scope below ends
        let _ = work_tx.send(entry);
    }
    drop(work_tx);

    let (done_tx, done_rx) = channel::unbounded();
    let func = &func;
    thread::scope(|scope| {
        for _ in 0..workers.min(total) {
            let work_rx = work_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                for (index, item) in work_rx.iter() {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| func(item)))
                        .map_err(|payload| Error::from_panic(&*payload))
                        .and_then(|result| result.map_err(Into::into));
                    let value = match outcome {
                        Ok(value) => Some(value),
                        Err(error) => {
                            tracing::error!(index, error = %error, "batch item failed");
                            None
                        }
                    };
                    let _ = done_tx.send((index, value));
                }
            });
        }
    });
    drop(done_tx);

    let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
    for (index, value) in done_rx.try_iter() {
        results[index] = value;
    }
    Ok(results)
}
