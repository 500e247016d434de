//! `Conditional`: inputs `[condition scope, true scope, false scope]`.

use super::{copy_value, run_scope, scalar_at, scope_input};
use crate::error::{GraphError, Result};
use crate::executor::GraphExecutioner;
use crate::flow_path::FlowPath;
use crate::graph::Graph;
use crate::node::Node;
use crate::variable::VarId;

/// Run the condition scope, then the true or false scope, and store the
/// last value of the chosen scope in `(conditional, 0)`.
pub(super) fn process(
    executioner: &GraphExecutioner,
    graph: &Graph,
    node: &Node,
    flow: &mut FlowPath,
) -> Result<()> {
    if node.inputs().len() != 3 {
        return Err(GraphError::bad_input(format!(
            "conditional {} expects 3 scope inputs, got {}",
            node.id(),
            node.inputs().len()
        )));
    }

    let condition = scope_input(graph, node, 0)?;
    let last = run_scope(executioner, graph, condition, flow)?;
    let taken = scalar_at(graph, VarId::of(last))? != 0.0;

    let chosen = scope_input(graph, node, if taken { 1 } else { 2 })?;
    let result = run_scope(executioner, graph, chosen, flow)?;
    flow.set_branch(node.id(), i32::from(!taken));

    tracing::debug!(node_id = node.id(), taken, scope = chosen.name(), "Conditional evaluated");
    copy_value(graph, VarId::of(result), VarId::of(node.id()))
}
