//! Type-erased values.
//!
//! Ports are typed (`Input<T>`, `Output<T>`), but a node's `calculate`
//! receives and returns a heterogeneous sequence. [`Value`] is the erased
//! carrier between the two: a shared, immutable payload that can be
//! downcast back to its concrete type.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::error::{CalculationError, CalculationResult};

/// Types that can flow through ports.
///
/// `PartialEq` drives change detection on inputs; `Clone` lets a value be
/// cached on both ends of a connection.
pub trait Data: Clone + PartialEq + Send + Sync + 'static {}

impl<T> Data for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// A type-erased value passed to and returned from `calculate`.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// Wrap a concrete value.
    pub fn new<T: Data>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Borrow the payload as `T`, if that is what it holds.
    pub fn get<T: Data>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Check whether the payload is a `T`.
    pub fn is<T: Data>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Clone the payload out as `T`.
    pub fn downcast<T: Data>(&self) -> Option<T> {
        self.get::<T>().cloned()
    }

    /// Name of the concrete type stored in this value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name)
            .finish()
    }
}

/// Fetch a required input from a `calculate` value sequence.
///
/// Fails with `MissingInput` if the position is absent or holds no value,
/// and with `InputType` if it holds something other than a `T`.
pub fn required<T: Data>(values: &[Option<Value>], index: usize) -> CalculationResult<&T> {
    let value = values
        .get(index)
        .and_then(Option::as_ref)
        .ok_or(CalculationError::MissingInput { index })?;
    value.get::<T>().ok_or(CalculationError::InputType {
        index,
        expected: type_name::<T>(),
    })
}

/// Fetch an optional input: `Ok(None)` when unconnected or out of range.
pub fn optional<T: Data>(values: &[Option<Value>], index: usize) -> CalculationResult<Option<&T>> {
    match values.get(index).and_then(Option::as_ref) {
        None => Ok(None),
        Some(value) => value.get::<T>().map(Some).ok_or(CalculationError::InputType {
            index,
            expected: type_name::<T>(),
        }),
    }
}
