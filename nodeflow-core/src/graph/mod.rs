//! Dataflow Graph
//!
//! This module implements the computation graph and its evaluation loop.
//!
//! # Overview
//!
//! The graph is a set of nodes wired output-to-input, where:
//!
//! - Nodes wrap a [`Calculate`] implementation and decide when to rerun it
//! - Connections carry values from an output to an input
//! - The [`Network`] owns both and repeats passes until nothing changes
//!
//! # Design Decisions
//!
//! 1. Convergence is detected by change counters on inputs, not by a
//!    precomputed order. Any wiring is accepted, including cycles.
//!
//! 2. Nodes and ports are shared handles. The network, the wiring code and
//!    the node itself all refer to the same slots.
//!
//! 3. Evaluation is single-threaded and synchronous. Nothing guards against
//!    mutating the graph while `evaluate` is running.

mod network;
mod node;

pub use network::{EvaluationReport, Network, NetworkConfig, Outcome, DEFAULT_MAX_ITERATIONS};
pub use node::{Calculate, Node, NodeId};
