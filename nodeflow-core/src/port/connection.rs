//! Connections
//!
//! A [`Connection<I, O>`] is a directed edge from an `Output<O>` to an
//! `Input<I>`. The bound `O: Into<I>` lets an output of a more specific type
//! feed an input expecting a more general one; the identity conversion
//! covers the common same-type case.
//!
//! A connection holds no value. It references both endpoints weakly, while
//! the endpoints (and the network) hold the connection strongly, so dropping
//! a node's ports never leaks through a connection.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::input::{Input, WeakInput};
use super::output::{Output, WeakOutput};
use super::value::Data;

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Object-safe behaviour shared by every `Connection<I, O>`.
trait Link: Send + Sync {
    fn id(&self) -> ConnectionId;
    fn push(&self);
    fn remove(&self);
}

struct Wire<I: Data, O: Data> {
    id: ConnectionId,
    output: RwLock<WeakOutput<O>>,
    input: RwLock<WeakInput<I>>,
    _types: PhantomData<fn(O) -> I>,
}

impl<I, O> Link for Wire<I, O>
where
    I: Data,
    O: Data + Into<I>,
{
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn push(&self) {
        let output = self.output.read().upgrade();
        let input = self.input.read().upgrade();
        let (Some(output), Some(input)) = (output, input) else {
            return;
        };
        let value = output.read().value();
        input.write().store(value.map(Into::into));
    }

    fn remove(&self) {
        // A removed wire no longer reaches either endpoint
        let output = std::mem::take(&mut *self.output.write()).upgrade();
        if let Some(output) = output {
            output.write().remove_connection(self.id);
        }
        let input = std::mem::take(&mut *self.input.write()).upgrade();
        if let Some(input) = input {
            input.write().detach(self.id);
        }
    }
}

/// A typed, directed edge from an `Output<O>` to an `Input<I>`.
///
/// Cloning produces another handle to the same connection.
pub struct Connection<I: Data, O: Data + Into<I>> {
    wire: Arc<Wire<I, O>>,
}

impl<I, O> Connection<I, O>
where
    I: Data,
    O: Data + Into<I>,
{
    /// Wire `output` to `input`, registering the connection on both ends.
    pub fn new(output: &Output<O>, input: &Input<I>) -> Self {
        let connection = Self {
            wire: Arc::new(Wire {
                id: ConnectionId::new(),
                output: RwLock::new(WeakOutput::new()),
                input: RwLock::new(WeakInput::new()),
                _types: PhantomData,
            }),
        };
        output.add_connection(&connection);
        input.set_connection(&connection);
        connection
    }

    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.wire.id
    }

    /// Copy the output's current value into the input.
    pub fn push(&self) {
        self.wire.push();
    }

    /// Detach from both endpoints.
    ///
    /// The output forgets every occurrence of this connection. The input
    /// forgets it only if it is still the attached one, and is left
    /// disconnected unless a static supplier is active.
    pub fn remove(&self) {
        self.wire.remove();
    }

    /// The linked output, if it is still alive.
    pub fn linked_output(&self) -> Option<Output<O>> {
        self.wire.output.read().upgrade().map(Output::from_shared)
    }

    /// The linked input, if it is still alive.
    pub fn linked_input(&self) -> Option<Input<I>> {
        self.wire.input.read().upgrade().map(Input::from_shared)
    }

    pub(crate) fn link_output(&self, output: WeakOutput<O>) {
        *self.wire.output.write() = output;
    }

    pub(crate) fn link_input(&self, input: WeakInput<I>) {
        *self.wire.input.write() = input;
    }
}

impl<I, O> Clone for Connection<I, O>
where
    I: Data,
    O: Data + Into<I>,
{
    fn clone(&self) -> Self {
        Self {
            wire: Arc::clone(&self.wire),
        }
    }
}

impl<I, O> fmt::Debug for Connection<I, O>
where
    I: Data,
    O: Data + Into<I>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.wire.id)
            .field("output_alive", &(self.wire.output.read().strong_count() > 0))
            .field("input_alive", &(self.wire.input.read().strong_count() > 0))
            .finish()
    }
}

/// A type-erased handle to a connection of any input/output type pair.
///
/// Equality is identity: two handles are equal when they refer to the same
/// connection.
#[derive(Clone)]
pub struct ConnectionRef {
    link: Arc<dyn Link>,
}

impl ConnectionRef {
    /// Get the ID of the referenced connection.
    pub fn id(&self) -> ConnectionId {
        self.link.id()
    }

    /// Copy the output's current value into the input.
    pub fn push(&self) {
        self.link.push();
    }

    /// Detach from both endpoints.
    pub fn remove(&self) {
        self.link.remove();
    }
}

impl<I, O> From<&Connection<I, O>> for ConnectionRef
where
    I: Data,
    O: Data + Into<I>,
{
    fn from(connection: &Connection<I, O>) -> Self {
        Self {
            link: connection.wire.clone(),
        }
    }
}

impl<I, O> From<Connection<I, O>> for ConnectionRef
where
    I: Data,
    O: Data + Into<I>,
{
    fn from(connection: Connection<I, O>) -> Self {
        Self {
            link: connection.wire,
        }
    }
}

impl PartialEq for ConnectionRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ConnectionRef {}

impl fmt::Debug for ConnectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionRef").field(&self.id()).finish()
    }
}
