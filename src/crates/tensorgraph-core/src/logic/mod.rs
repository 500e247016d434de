//! Control-flow ("logic") nodes.
//!
//! Logic nodes are not operations: they steer execution. A `While` node
//! repeatedly runs a condition scope and a body scope, a `Conditional`
//! node runs one of two scopes, `Return`, `Expose` and `Merge` move values
//! between variables. The executioner hands every logic node to a
//! [`LogicExecutor`]; [`DefaultLogicExecutor`] implements the kinds above.

mod conditional;
mod transfer;
mod while_loop;

use crate::error::{GraphError, Result};
use crate::executor::GraphExecutioner;
use crate::flow_path::FlowPath;
use crate::graph::Graph;
use crate::node::{LogicOp, Node};
use crate::scope::Scope;
use crate::variable::VarId;

/// Executes logic nodes on behalf of a [`GraphExecutioner`].
pub trait LogicExecutor: Send + Sync {
    /// Run `node`. Scope members are executed through
    /// [`GraphExecutioner::execute_node`] so that skip rules and timing
    /// apply to them as to any other node.
    fn process_node(
        &self,
        executioner: &GraphExecutioner,
        graph: &Graph,
        node: &Node,
        flow: &mut FlowPath,
    ) -> Result<()>;
}

/// Implements scope, while, conditional, return, expose and merge.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLogicExecutor;

impl LogicExecutor for DefaultLogicExecutor {
    fn process_node(
        &self,
        executioner: &GraphExecutioner,
        graph: &Graph,
        node: &Node,
        flow: &mut FlowPath,
    ) -> Result<()> {
        let op = node
            .logic_op()
            .ok_or_else(|| GraphError::bad_params(format!("node {} is not a logic node", node.id())))?;

        match op {
            // Members run on demand from the owning While/Conditional.
            LogicOp::Scope => Ok(()),
            LogicOp::While => while_loop::process(executioner, graph, node, flow),
            LogicOp::Conditional => conditional::process(executioner, graph, node, flow),
            LogicOp::Return => transfer::process_return(graph, node),
            LogicOp::Expose => transfer::process_expose(graph, node),
            LogicOp::Merge => transfer::process_merge(graph, node, flow),
            other => Err(GraphError::Unsupported(format!(
                "logic op {:?} in node {}",
                other,
                node.id()
            ))),
        }
    }
}

/// Scope referenced by input `index` of `node`.
fn scope_input<'g>(graph: &'g Graph, node: &Node, index: usize) -> Result<&'g Scope> {
    let input = node.inputs().get(index).ok_or_else(|| {
        GraphError::bad_input(format!("node {} has no input {}", node.id(), index))
    })?;
    graph
        .scope_by_id(input.node)
        .ok_or(GraphError::UnknownScope(input.node))
}

/// Execute every member of `scope` in order and return the id of its last
/// node.
fn run_scope(
    executioner: &GraphExecutioner,
    graph: &Graph,
    scope: &Scope,
    flow: &mut FlowPath,
) -> Result<i32> {
    for id in scope.nodes() {
        let member = graph
            .node(*id)
            .ok_or_else(|| GraphError::bad_graph(format!("scope {} lists unknown node {}", scope.id(), id)))?;
        executioner.execute_node(graph, member, flow)?;
    }
    scope
        .last_node()
        .ok_or_else(|| GraphError::bad_graph(format!("scope '{}' is empty", scope.name())))
}

/// Copy the value at `from` into `to`.
fn copy_value(graph: &Graph, from: VarId, to: VarId) -> Result<()> {
    let value = {
        let space = graph.variable_space();
        let source = space.get(from).ok_or(GraphError::UnknownVariable(from))?;
        if !source.has_value() {
            return Err(GraphError::bad_input(format!("variable {} is empty", from)));
        }
        source.value().clone()
    };
    graph.variable_space_mut().assign(to, value)
}

/// First element of the tensor at `id`.
fn scalar_at(graph: &Graph, id: VarId) -> Result<f64> {
    let space = graph.variable_space();
    space
        .tensor(id)?
        .scalar_value()
        .ok_or_else(|| GraphError::bad_input(format!("variable {} holds an empty tensor", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_logic_op() {
        let mut graph = Graph::new(1);
        graph
            .add_node(Node::logic(1, LogicOp::NextIteration).with_inputs(vec![VarId::of(-1)]))
            .unwrap();
        let err = GraphExecutioner::new().execute(&graph).unwrap_err();
        assert!(matches!(err, GraphError::Unsupported(_)));
    }

    #[test]
    fn test_scope_is_a_no_op() {
        let mut graph = Graph::new(1);
        graph.add_node(Node::logic(1, LogicOp::Scope)).unwrap();
        let mut flow = FlowPath::new();
        GraphExecutioner::new()
            .execute_with_flow_path(&graph, &mut flow)
            .unwrap();
        assert!(flow.was_executed(1));
    }
}
