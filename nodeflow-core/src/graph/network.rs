//! Network Evaluation
//!
//! The network owns the nodes and connections of a graph and drives it to a
//! fixed point.
//!
//! # Algorithm
//!
//! There is no topological order. Evaluation repeats passes over the nodes:
//!
//! 1. Re-initialise every node, discarding the previous run's state
//! 2. Refresh every node, in insertion order
//! 3. If no node recalculated during the pass, the network has stabilized
//! 4. Otherwise run another pass, up to the iteration cap
//!
//! A value produced by a node reaches a node earlier in the order only on the
//! next pass. Because convergence is detected by change tracking, feedback
//! loops are allowed; the cap stops graphs that never settle.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::node::{Node, NodeId};
use crate::error::CalculationResult;
use crate::port::{Connection, ConnectionRef, Data, Input, Output};

/// Default cap on evaluation passes.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Network settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Maximum passes per evaluation before giving up on stabilizing.
    pub max_iterations: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Why an evaluation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// A full pass recalculated nothing.
    Stabilized,
    /// The iteration cap was reached first. Not an error.
    Capped,
}

/// Summary of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Passes run, including the final quiet pass when stabilized.
    pub passes: usize,
    /// Passes in which at least one node recalculated.
    pub active_passes: usize,
    /// Total node recalculations over all passes.
    pub recalculations: usize,
    pub outcome: Outcome,
}

impl EvaluationReport {
    /// True if the run ended on a quiet pass rather than at the cap.
    pub fn stabilized(&self) -> bool {
        self.outcome == Outcome::Stabilized
    }
}

/// A graph of nodes and the connections between them.
///
/// Both collections keep insertion order and allow duplicates; removal
/// always strips every occurrence.
pub struct Network {
    nodes: Vec<Node>,
    connections: Vec<ConnectionRef>,
    config: NetworkConfig,
}

impl Network {
    /// Create an empty network with the default configuration.
    pub fn new() -> Self {
        Self::with_config(NetworkConfig::default())
    }

    /// Create an empty network with the given configuration.
    pub fn with_config(config: NetworkConfig) -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            config,
        }
    }

    /// The settings this network was created with.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Add a node to the end of the evaluation order.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.push(node);
        id
    }

    /// Add a connection to the network's collection.
    ///
    /// The connection must already be wired to its endpoints.
    pub fn add_connection(&mut self, connection: impl Into<ConnectionRef>) {
        self.connections.push(connection.into());
    }

    /// Wire `output` to `input` and add the resulting connection.
    ///
    /// A connection already feeding `input` is removed from the network and
    /// from its endpoints.
    pub fn connect<I, O>(&mut self, output: &Output<O>, input: &Input<I>) -> Connection<I, O>
    where
        I: Data,
        O: Data + Into<I>,
    {
        if let Some(previous) = input.connection() {
            self.remove_connections([previous]);
        }
        let connection = Connection::new(output, input);
        self.add_connection(&connection);
        connection
    }

    /// Remove every occurrence of each node, along with every connection
    /// touching it.
    pub fn remove_node<'a>(&mut self, nodes: impl IntoIterator<Item = &'a Node>) {
        for node in nodes {
            let id = node.id();
            self.nodes.retain(|n| n.id() != id);
            self.remove_connections(node.all_connections());
        }
    }

    /// Remove every occurrence of each connection and detach it from its
    /// endpoints.
    pub fn remove_connections<C>(&mut self, connections: impl IntoIterator<Item = C>)
    where
        C: Into<ConnectionRef>,
    {
        for connection in connections {
            let connection = connection.into();
            let id = connection.id();
            self.connections.retain(|c| c.id() != id);
            connection.remove();
        }
    }

    /// Initialise every node.
    pub fn init(&self) {
        for node in &self.nodes {
            node.init();
        }
    }

    /// Evaluate with the configured iteration cap.
    pub fn run(&mut self) -> CalculationResult<EvaluationReport> {
        self.evaluate(self.config.max_iterations)
    }

    /// Evaluate until stabilized or `max_iterations` passes have run.
    ///
    /// Any node error aborts the evaluation and is returned as is; state
    /// reached so far is left in place.
    pub fn evaluate(&mut self, max_iterations: usize) -> CalculationResult<EvaluationReport> {
        debug!(
            nodes = self.nodes.len(),
            connections = self.connections.len(),
            max_iterations,
            "evaluating network"
        );
        let result = self.converge(max_iterations);

        if let Ok(report) = &result {
            debug!(
                passes = report.passes,
                recalculations = report.recalculations,
                outcome = ?report.outcome,
                "evaluation finished"
            );
        }
        result
    }

    fn converge(&self, max_iterations: usize) -> CalculationResult<EvaluationReport> {
        self.init();

        let mut report = EvaluationReport {
            passes: 0,
            active_passes: 0,
            recalculations: 0,
            outcome: Outcome::Capped,
        };

        while report.passes < max_iterations {
            report.passes += 1;
            let mut recalculated = 0;
            for node in &self.nodes {
                if node.refresh()? {
                    recalculated += 1;
                }
            }
            trace!(pass = report.passes, recalculated, "pass complete");

            if recalculated == 0 {
                report.outcome = Outcome::Stabilized;
                break;
            }
            report.active_passes += 1;
            report.recalculations += recalculated;
        }

        Ok(report)
    }

    /// Nodes in evaluation order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Connections in insertion order.
    pub fn connections(&self) -> &[ConnectionRef] {
        &self.connections
    }

    /// Number of node entries, duplicates included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of connection entries, duplicates included.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Check whether a node with this id is in the network.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id() == id)
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("nodes", &self.nodes.len())
            .field("connections", &self.connections.len())
            .field("config", &self.config)
            .finish()
    }
}
