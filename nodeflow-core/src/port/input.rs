//! Node Inputs
//!
//! An [`Input<T>`] is the receiving end of a connection. It caches the last
//! value delivered to it and counts how many times that value actually
//! changed. Nodes compare this counter against a snapshot to decide whether
//! they need to recalculate.
//!
//! # Static inputs
//!
//! Instead of a connection, an input can be fed by a supplier function. A
//! static input reads its value from the supplier on every access, counts as
//! connected, and is forced dirty once at the start of every network run.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::connection::{Connection, ConnectionId, ConnectionRef};
use super::value::{Data, Value};

/// A function producing the value of a static input.
pub type Supplier<T> = Arc<dyn Fn() -> T + Send + Sync>;

pub(crate) type SharedInput<T> = Arc<RwLock<InputState<T>>>;
pub(crate) type WeakInput<T> = Weak<RwLock<InputState<T>>>;

/// Mutable state behind an [`Input`] handle.
pub(crate) struct InputState<T> {
    label: String,
    /// Cached value, `None` until something is delivered.
    value: Option<T>,
    connection: Option<ConnectionRef>,
    connected: bool,
    supplier: Option<Supplier<T>>,
    disabled: bool,
    /// Number of times the cached value changed since `init`.
    iteration: u64,
}

impl<T: Data> InputState<T> {
    /// Deliver a value, bumping the change counter if it differs.
    ///
    /// `None == None` is not a change; `Some(_)` vs `None` always is.
    pub(crate) fn store(&mut self, value: Option<T>) {
        if self.value != value {
            self.iteration += 1;
        }
        self.value = value;
    }

    /// Drop the reference to `id` if it is the attached connection.
    pub(crate) fn detach(&mut self, id: ConnectionId) {
        if self.connection.as_ref().map(ConnectionRef::id) == Some(id) {
            self.connection = None;
            self.connected = self.supplier.is_some();
        }
    }
}

/// The typed input of a node.
///
/// Cloning an input produces another handle to the same slot.
pub struct Input<T: Data> {
    inner: SharedInput<T>,
}

impl<T: Data> Input<T> {
    /// Create an unconnected input with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(InputState {
                label: label.into(),
                value: None,
                connection: None,
                connected: false,
                supplier: None,
                disabled: false,
                iteration: 0,
            })),
        }
    }

    pub(crate) fn from_shared(inner: SharedInput<T>) -> Self {
        Self { inner }
    }

    /// The label of this input.
    pub fn label(&self) -> String {
        self.inner.read().label.clone()
    }

    /// Exclude this input from the values passed to `calculate`.
    pub fn set_disabled(&self, disabled: bool) {
        self.inner.write().disabled = disabled;
    }

    /// Check whether this input is disabled.
    pub fn is_disabled(&self) -> bool {
        self.inner.read().disabled
    }

    /// Reset the change counter for a new network run.
    ///
    /// Static inputs start at 1 so the owning node sees them as changed on
    /// the first pass.
    pub fn init(&self) {
        let mut state = self.inner.write();
        state.iteration = if state.supplier.is_some() { 1 } else { 0 };
    }

    /// The current value: freshly supplied for static inputs, cached otherwise.
    pub fn get(&self) -> Option<T> {
        let supplier = {
            let state = self.inner.read();
            match &state.supplier {
                Some(supplier) => Arc::clone(supplier),
                None => return state.value.clone(),
            }
        };
        Some(supplier())
    }

    /// Deliver a value to this input.
    ///
    /// The change counter moves only when `value` differs from the cache.
    pub fn set(&self, value: T) {
        self.inner.write().store(Some(value));
    }

    /// True once a value has been delivered (or a static supplier is active)
    /// since the last `init`.
    pub fn has_value(&self) -> bool {
        self.inner.read().iteration != 0
    }

    /// Number of value changes since the last `init`.
    pub fn iteration(&self) -> u64 {
        self.inner.read().iteration
    }

    /// Attach a connection feeding this input.
    ///
    /// An input has at most one feeding connection: a different connection
    /// attached earlier is removed from both of its endpoints first.
    pub fn set_connection<O>(&self, connection: &Connection<T, O>)
    where
        O: Data + Into<T>,
    {
        let previous = self.inner.write().connection.take();
        if let Some(previous) = previous.filter(|c| c.id() != connection.id()) {
            previous.remove();
        }
        connection.link_input(Arc::downgrade(&self.inner));
        let mut state = self.inner.write();
        state.connection = Some(ConnectionRef::from(connection));
        state.connected = true;
    }

    /// Detach the current connection, if any.
    pub fn remove_connection(&self) {
        let mut state = self.inner.write();
        state.connection = None;
        state.connected = state.supplier.is_some();
    }

    /// The attached connection.
    pub fn connection(&self) -> Option<ConnectionRef> {
        self.inner.read().connection.clone()
    }

    /// True if a connection or a static supplier feeds this input.
    pub fn is_connected(&self) -> bool {
        self.inner.read().connected
    }

    /// Feed this input from `supplier` instead of a connection.
    pub fn use_static_input<F>(&self, supplier: F)
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let mut state = self.inner.write();
        state.supplier = Some(Arc::new(supplier));
        state.connected = true;
    }

    /// Stop using the static supplier.
    pub fn remove_static_input(&self) {
        let mut state = self.inner.write();
        state.supplier = None;
        if state.connection.is_none() {
            state.connected = false;
        }
    }

    /// Check whether a static supplier is active.
    pub fn uses_static_input(&self) -> bool {
        self.inner.read().supplier.is_some()
    }

    /// This input as the object-safe view a node returns from `inputs()`.
    pub fn slot(&self) -> &dyn AnyInput {
        self
    }
}

impl<T: Data> Clone for Input<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Data> fmt::Debug for Input<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        f.debug_struct("Input")
            .field("label", &state.label)
            .field("iteration", &state.iteration)
            .field("connected", &state.connected)
            .field("static", &state.supplier.is_some())
            .field("disabled", &state.disabled)
            .finish()
    }
}

/// Type-erased view of an [`Input`], as seen by the refresh algorithm.
pub trait AnyInput: Send + Sync {
    fn label(&self) -> String;
    fn iteration(&self) -> u64;
    fn has_value(&self) -> bool;
    fn is_connected(&self) -> bool;
    fn is_disabled(&self) -> bool;
    /// The current value, erased.
    fn value(&self) -> Option<Value>;
    fn init(&self);
    fn connection(&self) -> Option<ConnectionRef>;
}

impl<T: Data> AnyInput for Input<T> {
    fn label(&self) -> String {
        Input::label(self)
    }

    fn iteration(&self) -> u64 {
        Input::iteration(self)
    }

    fn has_value(&self) -> bool {
        Input::has_value(self)
    }

    fn is_connected(&self) -> bool {
        Input::is_connected(self)
    }

    fn is_disabled(&self) -> bool {
        Input::is_disabled(self)
    }

    fn value(&self) -> Option<Value> {
        self.get().map(Value::new)
    }

    fn init(&self) {
        Input::init(self)
    }

    fn connection(&self) -> Option<ConnectionRef> {
        Input::connection(self)
    }
}
