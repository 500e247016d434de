//! `While`: inputs `[v0 .. vN-1, condition scope, body scope]`.
//!
//! The loop variables are copied into `(while, 0..N-1)`, where condition
//! and body nodes read them. Each iteration runs the condition scope and
//! stops when its last node yields zero; otherwise the body scope runs and
//! its `Return` nodes write the next values back into the loop variables.

use super::{copy_value, run_scope, scalar_at, scope_input};
use crate::error::{GraphError, Result};
use crate::executor::GraphExecutioner;
use crate::flow_path::FlowPath;
use crate::graph::Graph;
use crate::node::Node;
use crate::variable::VarId;

pub(super) fn process(
    executioner: &GraphExecutioner,
    graph: &Graph,
    node: &Node,
    flow: &mut FlowPath,
) -> Result<()> {
    let inputs = node.inputs();
    if inputs.len() < 2 {
        return Err(GraphError::bad_input(format!(
            "while {} needs a condition and a body scope, got {} inputs",
            node.id(),
            inputs.len()
        )));
    }
    let carried = inputs.len() - 2;
    let condition = scope_input(graph, node, carried)?;
    let body = scope_input(graph, node, carried + 1)?;

    for (slot, input) in inputs[..carried].iter().enumerate() {
        copy_value(graph, *input, VarId::new(node.id(), slot as i32))?;
    }

    let limit = graph.configuration().max_loop_iterations;
    let mut iterations = 0u64;
    loop {
        let last = run_scope(executioner, graph, condition, flow)?;
        if scalar_at(graph, VarId::of(last))? == 0.0 {
            break;
        }

        iterations += 1;
        if iterations > limit {
            tracing::error!(node_id = node.id(), limit, "Loop iteration limit exceeded");
            return Err(GraphError::kernel_failure(
                node.id(),
                format!("while loop exceeded {} iterations", limit),
            ));
        }
        run_scope(executioner, graph, body, flow)?;
    }

    tracing::debug!(node_id = node.id(), iterations, "While loop finished");
    Ok(())
}
