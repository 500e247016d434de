//! Switch-driven divergence and merge.

mod common;

use common::{ids, op, registry};
use tensorgraph_core::{
    FlowPath, Graph, GraphExecutioner, LogicOp, Node, OpRegistry, Tensor, VarId, Variable,
};

/// ```text
///   x(-1)  p(-2)
///      \   /
///     switch(1)
///   slot0/   \slot1
///   +1 (2)   +100 (3)
///     |         |
///   +1 (4)      |
///      \       /
///      merge(5)
/// ```
fn branching(registry: &OpRegistry, predicate: f64) -> Graph {
    let mut graph = Graph::new(1);
    graph.add_variable(Variable::external(VarId::of(-1), Tensor::scalar(10.0)));
    graph.add_variable(Variable::external(VarId::of(-2), Tensor::scalar(predicate)));

    graph.add_node(op(registry, 1, "switch", &ids(&[-1, -2]))).unwrap();
    graph
        .add_node(op(registry, 2, "add_scalar", &[VarId::new(1, 0)]).with_scalar(1.0))
        .unwrap();
    graph
        .add_node(op(registry, 3, "add_scalar", &[VarId::new(1, 1)]).with_scalar(100.0))
        .unwrap();
    graph
        .add_node(op(registry, 4, "add_scalar", &ids(&[2])).with_scalar(1.0))
        .unwrap();
    graph
        .add_node(Node::logic(5, LogicOp::Merge).with_inputs(ids(&[4, 3])))
        .unwrap();
    graph
}

fn value(graph: &Graph, node: i32) -> Option<f64> {
    graph
        .variable_space()
        .get(VarId::of(node))
        .and_then(|v| v.tensor())
        .and_then(|t| t.scalar_value())
}

#[test]
fn test_false_predicate_takes_slot_zero() {
    let registry = registry();
    let graph = branching(&registry, 0.0);
    let mut flow = FlowPath::new();
    GraphExecutioner::new()
        .execute_with_flow_path(&graph, &mut flow)
        .unwrap();

    assert_eq!(flow.branch(1), 0);
    assert!(flow.was_executed(2));
    assert!(flow.was_executed(4));
    assert!(!flow.is_active(3));
    assert!(!flow.was_executed(3));
    assert_eq!(value(&graph, 4), Some(12.0));
    assert_eq!(value(&graph, 3), None);
    assert_eq!(value(&graph, 5), Some(12.0));
}

#[test]
fn test_true_predicate_skips_whole_false_chain() {
    let registry = registry();
    let graph = branching(&registry, 1.0);
    let mut flow = FlowPath::new();
    GraphExecutioner::new()
        .execute_with_flow_path(&graph, &mut flow)
        .unwrap();

    assert_eq!(flow.branch(1), 1);
    assert!(!flow.is_active(2));
    // skipped transitively through the inactive node 2
    assert!(!flow.is_active(4));
    assert_eq!(value(&graph, 3), Some(110.0));
    assert_eq!(value(&graph, 5), Some(110.0));
}

#[test]
fn test_flow_path_can_be_reused() {
    let registry = registry();
    let graph = branching(&registry, 1.0);
    let mut flow = FlowPath::new();
    let executioner = GraphExecutioner::new();
    executioner.execute_with_flow_path(&graph, &mut flow).unwrap();

    flow.reset();
    {
        let mut space = graph.variable_space_mut();
        space.put_tensor(VarId::of(-2), Tensor::scalar(0.0)).unwrap();
    }
    executioner.execute_with_flow_path(&graph, &mut flow).unwrap();
    assert_eq!(flow.branch(1), 0);
    assert_eq!(value(&graph, 5), Some(12.0));
}

#[test]
fn test_merge_without_active_input_fails() {
    let registry = registry();
    let mut graph = Graph::new(1);
    graph.add_variable(Variable::external(VarId::of(-1), Tensor::scalar(1.0)));
    graph.add_variable(Variable::external(VarId::of(-2), Tensor::scalar(1.0)));
    graph.add_node(op(&registry, 1, "switch", &ids(&[-1, -2]))).unwrap();
    graph
        .add_node(Node::logic(2, LogicOp::Merge).with_inputs(vec![VarId::new(1, 0)]))
        .unwrap();

    assert!(GraphExecutioner::new().execute(&graph).is_err());
}
