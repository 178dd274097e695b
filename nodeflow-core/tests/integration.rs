//! Integration Tests for Network Evaluation
//!
//! These tests wire small graphs together and check how the network
//! converges on them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nodeflow_core::port::value;
use nodeflow_core::{
    AnyInput, AnyOutput, Calculate, CalculationError, CalculationResult, Connection,
    ConnectionRef, Input, Network, Node, Outcome, Output, Value,
};

/// Emits the same constant on every call.
struct Constant {
    value: i64,
    output: Output<i64>,
}

impl Constant {
    fn new(value: i64) -> Self {
        Self {
            value,
            output: Output::new("value"),
        }
    }
}

impl Calculate for Constant {
    fn inputs(&self) -> Vec<&dyn AnyInput> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<&dyn AnyOutput> {
        vec![self.output.slot()]
    }

    fn calculate(&self, _: &[Option<Value>]) -> CalculationResult<Vec<Value>> {
        Ok(vec![Value::new(self.value)])
    }
}

/// Applies a function to its single input and counts its calls.
struct Map {
    input: Input<i64>,
    output: Output<i64>,
    f: fn(i64) -> i64,
    calls: Arc<AtomicUsize>,
}

impl Map {
    fn new(f: fn(i64) -> i64) -> Self {
        Self {
            input: Input::new("in"),
            output: Output::new("out"),
            f,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Calculate for Map {
    fn inputs(&self) -> Vec<&dyn AnyInput> {
        vec![self.input.slot()]
    }

    fn outputs(&self) -> Vec<&dyn AnyOutput> {
        vec![self.output.slot()]
    }

    fn calculate(&self, values: &[Option<Value>]) -> CalculationResult<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let x = value::required::<i64>(values, 0)?;
        Ok(vec![Value::new((self.f)(*x))])
    }
}

/// Sums whichever inputs it is given; unconnected inputs count as zero.
struct Sum {
    inputs: Vec<Input<i64>>,
    output: Output<i64>,
    arity: Arc<AtomicUsize>,
}

impl Sum {
    fn new(n: usize) -> Self {
        Self {
            inputs: (0..n).map(|i| Input::new(format!("term{i}"))).collect(),
            output: Output::new("sum"),
            arity: Arc::new(AtomicUsize::new(usize::MAX)),
        }
    }
}

impl Calculate for Sum {
    fn inputs(&self) -> Vec<&dyn AnyInput> {
        self.inputs.iter().map(Input::slot).collect()
    }

    fn outputs(&self) -> Vec<&dyn AnyOutput> {
        vec![self.output.slot()]
    }

    fn calculate(&self, values: &[Option<Value>]) -> CalculationResult<Vec<Value>> {
        self.arity.store(values.len(), Ordering::SeqCst);
        let mut total = 0;
        for index in 0..values.len() {
            total += value::optional::<i64>(values, index)?.copied().unwrap_or(0);
        }
        Ok(vec![Value::new(total)])
    }
}

/// Test the two-node scenario: a constant source feeding a doubler.
#[test]
fn constant_source_feeds_doubler() {
    let mut network = Network::new();

    let a = Constant::new(5);
    let b = Map::new(|x| x * 2);
    let b_calls = b.calls.clone();
    let b_out = b.output.clone();

    network.connect(&a.output, &b.input);
    let a = Node::new(a);
    let b = Node::new(b);
    network.add_node(a.clone());
    network.add_node(b.clone());

    let report = network.evaluate(100).unwrap();

    // A never settles, so the loop runs every pass without error
    assert_eq!(report.outcome, Outcome::Capped);
    assert_eq!(report.passes, 100);
    assert_eq!(a.iteration(), 100);

    // B ran once, in pass 1, and never again
    assert_eq!(b_out.get(), Some(10));
    assert_eq!(b.iteration(), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
}

/// Test that a linear chain stabilizes within its length.
#[test]
fn linear_chain_stabilizes_within_its_length() {
    let mut network = Network::new();

    let source = Map::new(|x| x);
    source.input.use_static_input(|| 3);
    let add = Map::new(|x| x + 4);
    let square = Map::new(|x| x * x);
    let negate = Map::new(|x| -x);
    let result = negate.output.clone();

    network.connect(&source.output, &add.input);
    network.connect(&add.output, &square.input);
    network.connect(&square.output, &negate.input);

    // Worst case: nodes added in reverse order
    for node in [Node::new(negate), Node::new(square), Node::new(add), Node::new(source)] {
        network.add_node(node);
    }

    let report = network.evaluate(1_000).unwrap();
    assert!(report.stabilized());
    assert!(report.active_passes <= 4);
    assert_eq!(result.get(), Some(-49));
}

/// Test that a static-only node runs once per evaluation.
#[test]
fn static_input_node_runs_once_per_evaluation() {
    let mut network = Network::new();

    let c = Map::new(|x| x + 1);
    c.input.use_static_input(|| 42);
    let calls = c.calls.clone();
    let out = c.output.clone();
    let input = c.input.clone();
    let node = Node::new(c);
    network.add_node(node.clone());

    network.init();
    assert!(input.has_value());

    let report = network.evaluate(100).unwrap();
    assert!(report.stabilized());
    assert_eq!(report.passes, 2);
    assert_eq!(out.get(), Some(43));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Nothing moved since
    assert!(!node.refresh().unwrap());

    // A fresh evaluation forces it again
    network.evaluate(100).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Test that disabling an input changes the arity seen by `calculate`.
#[test]
fn disabled_inputs_shrink_the_value_sequence() {
    let mut network = Network::new();

    let sum = Sum::new(3);
    for (i, input) in sum.inputs.iter().enumerate() {
        let term = (i as i64 + 1) * 10;
        input.use_static_input(move || term);
    }
    let arity = sum.arity.clone();
    let total = sum.output.clone();
    let middle = sum.inputs[1].clone();
    network.add_node(Node::new(sum));

    network.evaluate(10).unwrap();
    assert_eq!(arity.load(Ordering::SeqCst), 3);
    assert_eq!(total.get(), Some(60));

    middle.set_disabled(true);
    network.evaluate(10).unwrap();
    assert_eq!(arity.load(Ordering::SeqCst), 2);
    assert_eq!(total.get(), Some(40));
}

/// Test that unconnected inputs reach `calculate` as absent.
#[test]
fn unconnected_inputs_are_absent() {
    let mut network = Network::new();

    let sum = Sum::new(2);
    sum.inputs[0].use_static_input(|| 7);
    let total = sum.output.clone();
    let arity = sum.arity.clone();
    network.add_node(Node::new(sum));

    network.evaluate(10).unwrap();
    assert_eq!(arity.load(Ordering::SeqCst), 2);
    assert_eq!(total.get(), Some(7));
}

/// Test that removing a node removes every connection touching it.
#[test]
fn remove_node_drops_its_connections() {
    let mut network = Network::new();

    let source = Constant::new(1);
    let hub = Sum::new(2);
    let left = Map::new(|x| x);
    let right = Map::new(|x| x);
    let other = Constant::new(2);

    network.connect(&source.output, &hub.inputs[0]);
    network.connect(&other.output, &hub.inputs[1]);
    network.connect(&hub.output, &left.input);
    network.connect(&hub.output, &right.input);
    // Unrelated edge that must survive
    let bystander = Map::new(|x| x);
    network.connect(&other.output, &bystander.input);

    let hub_inputs = hub.inputs.clone();
    let hub_output = hub.output.clone();
    let left_input = left.input.clone();
    let hub = Node::new(hub);
    for node in [
        Node::new(source),
        Node::new(other),
        hub.clone(),
        Node::new(left),
        Node::new(right),
        Node::new(bystander),
    ] {
        network.add_node(node);
    }

    let touching = hub.all_connections().len();
    assert_eq!(touching, 4);
    let before = network.connection_count();

    network.remove_node([&hub]);

    assert!(!network.contains_node(hub.id()));
    assert_eq!(network.connection_count(), before - touching);
    assert!(hub.all_connections().is_empty());
    assert!(!hub_output.is_connected());
    assert!(hub_inputs.iter().all(|input| !input.is_connected()));
    assert!(!left_input.is_connected());

    // What remains still evaluates
    network.evaluate(10).unwrap();
}

/// Test that rewiring an input leaves no stale edge behind for `remove_node`.
#[test]
fn rewired_input_leaves_no_dangling_edge() {
    let mut network = Network::new();

    let first = Constant::new(1);
    let second = Constant::new(2);
    let sink = Map::new(|x| x);
    let sink_input = sink.input.clone();
    let first_out = first.output.clone();
    let second_out = second.output.clone();

    let stale = network.connect(&first.output, &sink.input);
    network.connect(&second.output, &sink.input);

    // Only the newest wiring survives, in the network and on both ports
    assert_eq!(network.connection_count(), 1);
    assert!(!first_out.is_connected());
    assert!(stale.linked_input().is_none());

    let sink = Node::new(sink);
    for node in [Node::new(first), Node::new(second), sink.clone()] {
        network.add_node(node);
    }
    network.evaluate(3).unwrap();
    assert_eq!(sink_input.get(), Some(2));

    network.remove_node([&sink]);
    assert_eq!(network.connection_count(), 0);
    assert!(first_out.connections().is_empty());
    assert!(second_out.connections().is_empty());
    assert!(!sink_input.is_connected());

    // Nothing reaches the removed node any more
    network.evaluate(3).unwrap();
    assert!(!sink_input.has_value());
}

/// Test that duplicate nodes and connections are all removed at once.
#[test]
fn removal_strips_duplicates() {
    let mut network = Network::new();

    let source = Constant::new(1);
    let sink = Map::new(|x| x);
    let sink_input = sink.input.clone();
    let connection = Connection::new(&source.output, &sink.input);
    network.add_connection(&connection);
    network.add_connection(&connection);
    network.add_connection(connection.clone());
    assert_eq!(network.connection_count(), 3);

    let node = Node::new(sink);
    network.add_node(node.clone());
    network.add_node(node.clone());
    network.add_node(Node::new(source));
    assert_eq!(network.node_count(), 3);

    network.remove_connections([ConnectionRef::from(&connection)]);
    assert_eq!(network.connection_count(), 0);
    assert!(!sink_input.is_connected());

    network.remove_node([&node]);
    assert_eq!(network.node_count(), 1);

    // Removing again is harmless
    network.remove_node([&node]);
    network.remove_connections([connection]);
    assert_eq!(network.node_count(), 1);
}

/// Test that a calculation error aborts the evaluation.
#[test]
fn calculation_error_aborts_evaluation() {
    struct Checked {
        input: Input<i64>,
    }

    impl Calculate for Checked {
        fn inputs(&self) -> Vec<&dyn AnyInput> {
            vec![self.input.slot()]
        }

        fn outputs(&self) -> Vec<&dyn AnyOutput> {
            Vec::new()
        }

        fn calculate(&self, values: &[Option<Value>]) -> CalculationResult<Vec<Value>> {
            let x = value::required::<i64>(values, 0)?;
            if *x < 0 {
                return Err(CalculationError::invalid("negative input"));
            }
            Ok(Vec::new())
        }
    }

    let mut network = Network::new();
    let source = Constant::new(-1);
    let checked = Checked {
        input: Input::new("x"),
    };
    let after = Map::new(|x| x);
    after.input.use_static_input(|| 0);
    let after_calls = after.calls.clone();

    network.connect(&source.output, &checked.input);
    network.add_node(Node::new(source));
    network.add_node(Node::new(checked));
    network.add_node(Node::new(after));

    let err = network.evaluate(10).unwrap_err();
    assert_eq!(err, CalculationError::invalid("negative input"));
    // The pass was cut short before the last node
    assert_eq!(after_calls.load(Ordering::SeqCst), 0);
}

/// Test that a typed output rejects a value of the wrong type.
#[test]
fn wrongly_typed_result_is_an_error() {
    struct Liar(Output<i64>);

    impl Calculate for Liar {
        fn inputs(&self) -> Vec<&dyn AnyInput> {
            Vec::new()
        }

        fn outputs(&self) -> Vec<&dyn AnyOutput> {
            vec![self.0.slot()]
        }

        fn calculate(&self, _: &[Option<Value>]) -> CalculationResult<Vec<Value>> {
            Ok(vec![Value::new(String::from("not a number"))])
        }
    }

    let mut network = Network::new();
    network.add_node(Node::new(Liar(Output::new("n"))));

    let err = network.evaluate(10).unwrap_err();
    assert!(matches!(err, CalculationError::OutputType { .. }));
}

/// Test that disabled outputs receive nothing and push nothing.
#[test]
fn disabled_outputs_are_skipped() {
    struct Pair {
        first: Output<i64>,
        second: Output<i64>,
    }

    impl Calculate for Pair {
        fn inputs(&self) -> Vec<&dyn AnyInput> {
            Vec::new()
        }

        fn outputs(&self) -> Vec<&dyn AnyOutput> {
            vec![self.first.slot(), self.second.slot()]
        }

        fn calculate(&self, _: &[Option<Value>]) -> CalculationResult<Vec<Value>> {
            let enabled = [&self.first, &self.second]
                .iter()
                .filter(|o| !o.is_disabled())
                .count();
            Ok((0..enabled).map(|i| Value::new(i as i64 + 1)).collect())
        }
    }

    let pair = Pair {
        first: Output::new("first"),
        second: Output::new("second"),
    };
    pair.first.set_disabled(true);
    let first = pair.first.clone();
    let second = pair.second.clone();

    let mut network = Network::new();
    network.add_node(Node::new(pair));
    network.evaluate(1).unwrap();

    assert_eq!(first.get(), None);
    assert_eq!(second.get(), Some(1));
}

/// Test that a more specific output type can feed a general input.
#[test]
fn specific_output_feeds_general_input() {
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Celsius(i64);

    impl From<Celsius> for i64 {
        fn from(c: Celsius) -> i64 {
            c.0
        }
    }

    struct Thermometer(Output<Celsius>);

    impl Calculate for Thermometer {
        fn inputs(&self) -> Vec<&dyn AnyInput> {
            Vec::new()
        }

        fn outputs(&self) -> Vec<&dyn AnyOutput> {
            vec![self.0.slot()]
        }

        fn calculate(&self, _: &[Option<Value>]) -> CalculationResult<Vec<Value>> {
            Ok(vec![Value::new(Celsius(21))])
        }
    }

    let thermometer = Thermometer(Output::new("reading"));
    let offset = Map::new(|x| x + 273);
    let kelvin = offset.output.clone();

    let mut network = Network::new();
    network.connect(&thermometer.0, &offset.input);
    network.add_node(Node::new(thermometer));
    network.add_node(Node::new(offset));

    network.evaluate(5).unwrap();
    assert_eq!(kelvin.get(), Some(294));
}
