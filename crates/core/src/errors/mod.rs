//! Error types, error filters and result extensions for gizmos operations

mod builders;
mod conversions;
mod display;
mod extensions;
mod filter;
mod types;

pub use extensions::*;
pub use filter::ErrorFilter;
pub use types::{Error, ErrorKind, Result, SharedSource};
