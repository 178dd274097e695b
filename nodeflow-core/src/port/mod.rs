//! Ports and Connections
//!
//! Values move between nodes through typed ports:
//!
//! - [`Input<T>`]: receives a value and counts how often it changed
//! - [`Output<T>`]: caches a produced value and fans it out
//! - [`Connection<I, O>`]: a directed edge from one output to one input
//!
//! The refresh algorithm works on mixed port types, so each port also has an
//! object-safe view ([`AnyInput`], [`AnyOutput`]) and values cross that
//! boundary as [`Value`].
//!
//! # Sharing
//!
//! Ports are handles over shared state, like the rest of the graph: a node
//! keeps one clone, the wiring code keeps another, and both see the same
//! slot. Connections point at their endpoints weakly.

mod connection;
mod input;
mod output;
pub mod value;

pub use connection::{Connection, ConnectionId, ConnectionRef};
pub use input::{AnyInput, Input, Supplier};
pub use output::{AnyOutput, Output};
pub use value::{Data, Value};
