//! Thread based helpers: a worker pool over a task queue, periodic
//! background tasks and scoped batch processing.
//!
//! ## Key Components
//!
//! - [`queue`] - [`QueueProcessor`], a restartable pool of named workers
//!   shut down with one sentinel per worker
//! - [`periodic`] - [`PeriodicTask`], a closure repeated on an interval
//! - [`batch`] - [`batch_process`], an order-preserving parallel map

pub mod batch;
pub mod periodic;
pub mod queue;

pub use batch::batch_process;
pub use periodic::PeriodicTask;
pub use queue::{FailurePolicy, Message, QueueConfig, QueueHandle, QueueProcessor};
