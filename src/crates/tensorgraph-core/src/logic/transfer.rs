//! Logic nodes that only move values: `Return`, `Expose` and `Merge`.

use super::copy_value;
use crate::error::{GraphError, Result};
use crate::flow_path::FlowPath;
use crate::graph::Graph;
use crate::node::Node;
use crate::variable::{VarId, Variable};

/// Copy input `e` into output `e` for every input.
pub(super) fn process_return(graph: &Graph, node: &Node) -> Result<()> {
    for (index, input) in node.inputs().iter().enumerate() {
        let target = node.outputs().get(index).ok_or_else(|| {
            GraphError::bad_input(format!(
                "return {} has no output for input {}",
                node.id(),
                index
            ))
        })?;
        copy_value(graph, *input, *target)?;
    }
    Ok(())
}

/// Publish input 0 as this node's result.
pub(super) fn process_expose(graph: &Graph, node: &Node) -> Result<()> {
    let input = node
        .inputs()
        .first()
        .ok_or_else(|| GraphError::bad_input(format!("expose {} has no input", node.id())))?;
    copy_value(graph, *input, VarId::of(node.id()))
}

/// Forward the first input whose producer ran on this path and holds a value.
pub(super) fn process_merge(graph: &Graph, node: &Node, flow: &FlowPath) -> Result<()> {
    let chosen = node.inputs().iter().find(|input| {
        if !flow.is_active(input.node) {
            return false;
        }
        if let Some(producer) = graph.node(input.node) {
            if producer.is_divergent() && flow.branch(producer.id()) != input.slot {
                return false;
            }
        }
        graph
            .variable_space()
            .get(**input)
            .is_some_and(Variable::has_value)
    });

    match chosen {
        Some(input) => {
            tracing::trace!(node_id = node.id(), from = %input, "Merge forwarded input");
            copy_value(graph, *input, VarId::of(node.id()))
        }
        None => Err(GraphError::bad_input(format!(
            "merge {} has no active input",
            node.id()
        ))),
    }
}
