//! Guard functions for validating parameters.
//!
//! Every check comes in two flavours: an `is_*` predicate that answers a
//! question, and an `ensure_*` variant that turns a failed check into a
//! typed [`Error`] so constructors and setters can bail out with `?`.
//!
//! Callables and error "types" are checked by the compiler (`Fn*` bounds and
//! [`ErrorKind`](crate::ErrorKind)), so there are no runtime guards for them.

use crate::errors::{Error, ErrorFilter, Result};
use std::any::{type_name, Any};
use std::collections::HashSet;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Whether bounds include their end points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bounds {
    #[default]
    Inclusive,
    Exclusive,
}

/// Whether `value` is a `T`
pub fn is_instance_of<T: Any>(value: &dyn Any) -> bool {
    value.is::<T>()
}

/// Ensure `value` is a `T`
pub fn ensure_instance_of<T: Any>(parameter: &str, value: &dyn Any) -> Result<()> {
    if is_instance_of::<T>(value) {
        Ok(())
    } else {
        Err(Error::type_mismatch(
            parameter,
            type_name::<T>(),
            "a different type",
        ))
    }
}

/// Whether `value` lies within the given bounds
///
/// A missing bound is unbounded on that side. NaN is never in bounds.
pub fn is_in_bounds<T>(value: T, lower: Option<T>, upper: Option<T>, bounds: Bounds) -> bool
where
    T: PartialOrd + Copy,
{
    // NaN is unordered against itself
    if value.partial_cmp(&value).is_none() {
        return false;
    }

    let above = match (lower, bounds) {
        (None, _) => true,
        (Some(lo), Bounds::Inclusive) => value >= lo,
        (Some(lo), Bounds::Exclusive) => value > lo,
    };
    let below = match (upper, bounds) {
        (None, _) => true,
        (Some(hi), Bounds::Inclusive) => value <= hi,
        (Some(hi), Bounds::Exclusive) => value < hi,
    };

    above && below
}

/// Ensure `value` lies within the given bounds
pub fn ensure_in_bounds<T>(
    parameter: &str,
    value: T,
    lower: Option<T>,
    upper: Option<T>,
    bounds: Bounds,
) -> Result<()>
where
    T: PartialOrd + Copy + Display,
{
    if is_in_bounds(value, lower, upper, bounds) {
        return Ok(());
    }

    let (open, close, lo_op, hi_op) = match bounds {
        Bounds::Inclusive => ('[', ']', ">=", "<="),
        Bounds::Exclusive => ('(', ')', ">", "<"),
    };
    let message = match (lower, upper) {
        (Some(lo), Some(hi)) => format!("{value} must be in the bounds {open}{lo}, {hi}{close}"),
        (Some(lo), None) => format!("{value} must be {lo_op} {lo}"),
        (None, Some(hi)) => format!("{value} must be {hi_op} {hi}"),
        (None, None) => format!("{value} is not a comparable number"),
    };
    Err(Error::invalid_argument(parameter, message))
}

/// Whether `value` is one of `allowed`
pub fn is_one_of<T: PartialEq>(value: &T, allowed: &[T]) -> bool {
    allowed.contains(value)
}

/// Ensure `value` is one of `allowed`
pub fn ensure_one_of<T: PartialEq + Debug>(parameter: &str, value: &T, allowed: &[T]) -> Result<()> {
    if is_one_of(value, allowed) {
        Ok(())
    } else {
        Err(Error::invalid_argument(
            parameter,
            format!("{value:?} must be one of {allowed:?}"),
        ))
    }
}

/// Whether `items` contains any item more than once
pub fn contains_duplicates<T: Hash + Eq>(items: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().any(|item| !seen.insert(item))
}

/// Ensure `items` contains no duplicates
pub fn ensure_no_duplicates<T: Hash + Eq + Debug>(what: &str, items: &[T]) -> Result<()> {
    if contains_duplicates(items) {
        Err(Error::duplicate(
            what,
            format!("{items:?} contain duplicate items, expected no duplicates"),
        ))
    } else {
        Ok(())
    }
}

/// Ensure `items` is not empty
pub fn ensure_not_empty<T>(parameter: &str, items: &[T]) -> Result<()> {
    if items.is_empty() {
        Err(Error::invalid_argument(parameter, "must not be empty"))
    } else {
        Ok(())
    }
}

/// Ensure `filter` names a usable, duplicate-free set of errors
pub fn ensure_watchable(filter: &ErrorFilter) -> Result<()> {
    filter.validate()
}

/// Ensure a float is finite and non-negative, returning it for chaining
pub fn ensure_non_negative_secs(parameter: &str, secs: f64) -> Result<f64> {
    if !secs.is_finite() {
        return Err(Error::invalid_argument(parameter, format!("{secs} is not finite")));
    }
    ensure_in_bounds(parameter, secs, Some(0.0), None, Bounds::Inclusive)?;
    Ok(secs)
}
