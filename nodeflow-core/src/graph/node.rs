//! Graph Nodes
//!
//! This module defines the unit of computation and its refresh protocol.
//!
//! A concrete computation implements [`Calculate`]: it declares its ports and
//! maps input values to output values. [`Node`] wraps it with the state the
//! network needs to decide when to run it.
//!
//! # Refresh
//!
//! Every input carries a change counter. A node keeps one snapshot per input
//! and recalculates only when some counter moved since the last refresh.
//! A node with no inputs has nothing to compare and recalculates on every
//! refresh.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::error::{CalculationError, CalculationResult};
use crate::port::{AnyInput, AnyOutput, ConnectionId, ConnectionRef, Value};

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The capability every concrete node provides.
///
/// `inputs` and `outputs` must return the same ports in the same order on
/// every call during a run; the refresh snapshot is indexed by position.
pub trait Calculate: Send + Sync {
    /// The node's inputs, in declaration order.
    fn inputs(&self) -> Vec<&dyn AnyInput>;

    /// The node's outputs, in declaration order.
    fn outputs(&self) -> Vec<&dyn AnyOutput>;

    /// Compute output values from input values.
    ///
    /// `values` holds one entry per non-disabled input, in order: the input's
    /// value, or `None` if it is unconnected. The result must hold one value
    /// per non-disabled output.
    fn calculate(&self, values: &[Option<Value>]) -> CalculationResult<Vec<Value>>;

    /// A name for logs and debugging.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Refresh bookkeeping for a node.
#[derive(Debug, Default)]
struct RefreshState {
    /// Number of completed recalculations since `init`.
    iteration: u64,
    /// Input change counters seen at the last refresh, by input position.
    last_input_iteration: SmallVec<[u64; 4]>,
}

struct NodeInner {
    id: NodeId,
    calc: Box<dyn Calculate>,
    state: Mutex<RefreshState>,
}

/// A node in the network.
///
/// Cloning a node produces another handle to the same node; handles compare
/// equal when they share an id.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Wrap a computation in a node.
    pub fn new<C>(calc: C) -> Self
    where
        C: Calculate + 'static,
    {
        Self {
            inner: Arc::new(NodeInner {
                id: NodeId::new(),
                calc: Box::new(calc),
                state: Mutex::new(RefreshState::default()),
            }),
        }
    }

    /// Get this node's ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// The name reported by the wrapped computation.
    pub fn name(&self) -> &str {
        self.inner.calc.name()
    }

    /// Reset for a new run.
    ///
    /// Clears the iteration count, sizes the input snapshot to the current
    /// number of inputs, and re-initialises every input. Changing the number
    /// of inputs afterwards, within the same run, is unsupported.
    pub fn init(&self) {
        let inputs = self.inner.calc.inputs();
        {
            let mut state = self.inner.state.lock();
            state.iteration = 0;
            state.last_input_iteration = SmallVec::from_elem(0, inputs.len());
        }
        for input in inputs {
            input.init();
        }
    }

    /// Recalculate if any input changed.
    ///
    /// Returns `Ok(true)` if the node recalculated and pushed its outputs,
    /// `Ok(false)` if nothing changed or a connected input has no value yet.
    pub fn refresh(&self) -> CalculationResult<bool> {
        let calc = &*self.inner.calc;
        let inputs = calc.inputs();

        let mut recalculate = false;
        {
            let mut state = self.inner.state.lock();
            if state.last_input_iteration.len() != inputs.len() {
                warn!(
                    node = calc.name(),
                    expected = state.last_input_iteration.len(),
                    actual = inputs.len(),
                    "input count changed since init, resizing snapshot"
                );
                state.last_input_iteration.resize(inputs.len(), 0);
            }
            for (input, last) in inputs.iter().zip(state.last_input_iteration.iter_mut()) {
                let iteration = input.iteration();
                if iteration != *last {
                    recalculate = true;
                    *last = iteration;
                }
            }
        }

        if !recalculate && !inputs.is_empty() {
            return Ok(false);
        }

        let Some(values) = collect_values(calc.name(), &inputs) else {
            return Ok(false);
        };

        let results = calc.calculate(&values)?;

        let outputs: Vec<&dyn AnyOutput> = calc
            .outputs()
            .into_iter()
            .filter(|output| !output.is_disabled())
            .collect();
        if results.len() != outputs.len() {
            return Err(CalculationError::OutputCount {
                expected: outputs.len(),
                actual: results.len(),
            });
        }
        for (output, value) in outputs.into_iter().zip(results) {
            output.store(value)?;
            for connection in output.connections() {
                connection.push();
            }
        }

        let iteration = {
            let mut state = self.inner.state.lock();
            state.iteration += 1;
            state.iteration
        };
        trace!(node = calc.name(), iteration, "recalculated");
        Ok(true)
    }

    /// True once the node has recalculated at least once since `init`.
    pub fn has_output_available(&self) -> bool {
        self.iteration() != 0
    }

    /// Number of recalculations since `init`.
    pub fn iteration(&self) -> u64 {
        self.inner.state.lock().iteration
    }

    /// Every connection touching this node, without duplicates.
    ///
    /// Inbound connections come first, in input order, then outbound ones.
    pub fn all_connections(&self) -> Vec<ConnectionRef> {
        let mut connections: IndexMap<ConnectionId, ConnectionRef> = IndexMap::new();
        for input in self.inner.calc.inputs() {
            if let Some(connection) = input.connection() {
                connections.entry(connection.id()).or_insert(connection);
            }
        }
        for output in self.inner.calc.outputs() {
            for connection in output.connections() {
                connections.entry(connection.id()).or_insert(connection);
            }
        }
        connections.into_values().collect()
    }

    /// Number of declared inputs.
    pub fn input_count(&self) -> usize {
        self.inner.calc.inputs().len()
    }

    /// Number of declared outputs.
    pub fn output_count(&self) -> usize {
        self.inner.calc.outputs().len()
    }
}

/// Build the value sequence for `calculate`.
///
/// Disabled inputs are skipped entirely. Returns `None` if a connected input
/// has no value yet.
fn collect_values(node: &str, inputs: &[&dyn AnyInput]) -> Option<Vec<Option<Value>>> {
    let mut values = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        if input.is_disabled() {
            continue;
        }
        if !input.is_connected() {
            values.push(None);
        } else if input.has_value() {
            values.push(input.value());
        } else {
            trace!(node, index, input = %input.label(), "waiting on input");
            return None;
        }
    }
    Some(values)
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Node")
            .field("id", &self.inner.id)
            .field("name", &self.name())
            .field("iteration", &state.iteration)
            .finish()
    }
}
