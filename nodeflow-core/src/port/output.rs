//! Node Outputs
//!
//! An [`Output<T>`] caches the value its node last produced and fans it out
//! to every attached connection. It does no change tracking of its own;
//! that lives on the downstream inputs.

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::connection::{Connection, ConnectionId, ConnectionRef};
use super::value::{Data, Value};
use crate::error::{CalculationError, CalculationResult};

pub(crate) type SharedOutput<T> = Arc<RwLock<OutputState<T>>>;
pub(crate) type WeakOutput<T> = Weak<RwLock<OutputState<T>>>;

/// Mutable state behind an [`Output`] handle.
pub(crate) struct OutputState<T> {
    label: String,
    value: Option<T>,
    /// Outgoing connections in insertion order. Duplicates are allowed.
    connections: Vec<ConnectionRef>,
    connected: bool,
    disabled: bool,
}

impl<T: Data> OutputState<T> {
    pub(crate) fn value(&self) -> Option<T> {
        self.value.clone()
    }

    /// Remove every occurrence of `id`.
    pub(crate) fn remove_connection(&mut self, id: ConnectionId) {
        self.connections.retain(|c| c.id() != id);
        if self.connections.is_empty() {
            self.connected = false;
        }
    }
}

/// The typed output of a node.
///
/// Cloning an output produces another handle to the same slot.
pub struct Output<T: Data> {
    inner: SharedOutput<T>,
}

impl<T: Data> Output<T> {
    /// Create an unconnected output with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(OutputState {
                label: label.into(),
                value: None,
                connections: Vec::new(),
                connected: false,
                disabled: false,
            })),
        }
    }

    pub(crate) fn from_shared(inner: SharedOutput<T>) -> Self {
        Self { inner }
    }

    /// The label of this output.
    pub fn label(&self) -> String {
        self.inner.read().label.clone()
    }

    /// Skip this output when storing calculated values.
    pub fn set_disabled(&self, disabled: bool) {
        self.inner.write().disabled = disabled;
    }

    /// Check whether this output is disabled.
    pub fn is_disabled(&self) -> bool {
        self.inner.read().disabled
    }

    /// Register `connection` and point it back at this output.
    ///
    /// Adding the same connection twice registers it twice, so its value is
    /// pushed twice per recalculation.
    pub fn add_connection<I>(&self, connection: &Connection<I, T>)
    where
        I: Data,
        T: Into<I>,
    {
        connection.link_output(Arc::downgrade(&self.inner));
        let mut state = self.inner.write();
        state.connections.push(ConnectionRef::from(connection));
        state.connected = true;
    }

    /// Remove every occurrence of the connection with this id.
    pub fn remove_connection(&self, id: ConnectionId) {
        self.inner.write().remove_connection(id);
    }

    /// The last produced value.
    pub fn get(&self) -> Option<T> {
        self.inner.read().value()
    }

    /// Overwrite the cached value. Does not push.
    pub fn set(&self, value: T) {
        self.inner.write().value = Some(value);
    }

    /// Snapshot of the outgoing connections.
    pub fn connections(&self) -> Vec<ConnectionRef> {
        self.inner.read().connections.clone()
    }

    /// True while at least one connection is attached.
    pub fn is_connected(&self) -> bool {
        self.inner.read().connected
    }

    /// This output as the object-safe view a node returns from `outputs()`.
    pub fn slot(&self) -> &dyn AnyOutput {
        self
    }
}

impl<T: Data> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Data> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        f.debug_struct("Output")
            .field("label", &state.label)
            .field("has_value", &state.value.is_some())
            .field("connections", &state.connections.len())
            .field("disabled", &state.disabled)
            .finish()
    }
}

/// Type-erased view of an [`Output`], as seen by the refresh algorithm.
pub trait AnyOutput: Send + Sync {
    fn label(&self) -> String;
    fn is_disabled(&self) -> bool;
    fn is_connected(&self) -> bool;
    /// Store a calculated value, checking that it holds the slot's type.
    fn store(&self, value: Value) -> CalculationResult<()>;
    fn connections(&self) -> Vec<ConnectionRef>;
}

impl<T: Data> AnyOutput for Output<T> {
    fn label(&self) -> String {
        Output::label(self)
    }

    fn is_disabled(&self) -> bool {
        Output::is_disabled(self)
    }

    fn is_connected(&self) -> bool {
        Output::is_connected(self)
    }

    fn store(&self, value: Value) -> CalculationResult<()> {
        let value = value
            .downcast::<T>()
            .ok_or_else(|| CalculationError::OutputType {
                output: self.label(),
                expected: type_name::<T>(),
            })?;
        self.set(value);
        Ok(())
    }

    fn connections(&self) -> Vec<ConnectionRef> {
        Output::connections(self)
    }
}
