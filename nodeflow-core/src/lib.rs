//! Nodeflow Core
//!
//! This crate provides the runtime for Nodeflow dataflow graphs.
//! It implements:
//!
//! - Typed ports (inputs, outputs) and the connections between them
//! - Nodes with change-tracked refresh
//! - A network that evaluates the graph to a fixed point
//!
//! What a node computes is up to the caller: implement [`Calculate`] for a
//! type holding its ports, wrap it in a [`Node`], and add it to a
//! [`Network`].
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `port`: Inputs, outputs, connections and type-erased values
//! - `graph`: Nodes, the refresh protocol and the evaluation loop
//! - `error`: The calculation error type
//!
//! # Example
//!
//! ```rust
//! use nodeflow_core::port::value;
//! use nodeflow_core::{
//!     AnyInput, AnyOutput, Calculate, CalculationResult, Input, Network, Node, Output, Value,
//! };
//!
//! struct Double {
//!     input: Input<i64>,
//!     output: Output<i64>,
//! }
//!
//! impl Calculate for Double {
//!     fn inputs(&self) -> Vec<&dyn AnyInput> {
//!         vec![self.input.slot()]
//!     }
//!
//!     fn outputs(&self) -> Vec<&dyn AnyOutput> {
//!         vec![self.output.slot()]
//!     }
//!
//!     fn calculate(&self, values: &[Option<Value>]) -> CalculationResult<Vec<Value>> {
//!         let x = value::required::<i64>(values, 0)?;
//!         Ok(vec![Value::new(x * 2)])
//!     }
//! }
//!
//! let double = Double {
//!     input: Input::new("x"),
//!     output: Output::new("2x"),
//! };
//! double.input.use_static_input(|| 21);
//! let result = double.output.clone();
//!
//! let mut network = Network::new();
//! network.add_node(Node::new(double));
//! let report = network.evaluate(100).unwrap();
//!
//! assert!(report.stabilized());
//! assert_eq!(result.get(), Some(42));
//! ```

pub mod error;
pub mod graph;
pub mod port;

pub use error::{CalculationError, CalculationResult};
pub use graph::{Calculate, EvaluationReport, Network, NetworkConfig, Node, NodeId, Outcome};
pub use port::{AnyInput, AnyOutput, Connection, ConnectionId, ConnectionRef, Input, Output, Value};
