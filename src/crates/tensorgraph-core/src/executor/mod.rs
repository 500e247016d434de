//! Layer-by-layer graph execution.
//!
//! [`GraphExecutioner`] builds a graph if needed and walks its onion in
//! layer order. Within a layer, nodes run in stored order; when the graph's
//! configuration enables [`ExecutionMode::Auto`](tensorgraph_wire::ExecutionMode::Auto)
//! and a layer holds more than one operation node, their bodies run on
//! rayon workers against a shared read lock of the variable space and their
//! outputs are committed in stored order once the whole layer is done.
//!
//! # Per-node step
//!
//! ```text
//!  logic node? ──yes──▶ LogicExecutor::process_node
//!      │no
//!      ▼
//!  any internal producer inactive, or a divergence point
//!  that chose another branch than this edge's slot?
//!      │yes ──▶ mark inactive, skip
//!      │no
//!      ▼
//!  run body (inner time) ─▶ commit outputs ─▶ record branch (outer time)
//! ```
//!
//! Any error aborts the traversal and is returned unchanged.

mod buffer;
mod embedded;

pub use buffer::{execute_from_buffer, import_from_file};

use crate::error::Result;
use crate::flow_path::FlowPath;
use crate::graph::Graph;
use crate::logic::{DefaultLogicExecutor, LogicExecutor};
use crate::node::{Node, NodeKind};
use crate::ops::{Context, Operation};
use crate::variable::{VarId, VariableValue};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of one operation body, not yet committed.
struct NodeRun {
    outputs: BTreeMap<i32, VariableValue>,
    branch: Option<i32>,
    inner: Duration,
}

fn micros(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}

/// Executes graphs.
#[derive(Clone)]
pub struct GraphExecutioner {
    logic: Arc<dyn LogicExecutor>,
}

impl Default for GraphExecutioner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphExecutioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphExecutioner").finish_non_exhaustive()
    }
}

impl GraphExecutioner {
    pub fn new() -> Self {
        Self {
            logic: Arc::new(DefaultLogicExecutor),
        }
    }

    /// Replace the executor used for logic nodes.
    pub fn with_logic_executor(mut self, logic: Arc<dyn LogicExecutor>) -> Self {
        self.logic = logic;
        self
    }

    /// Execute with a temporary flow path.
    pub fn execute(&self, graph: &Graph) -> Result<()> {
        let mut flow = FlowPath::new();
        self.execute_with_flow_path(graph, &mut flow)
    }

    /// Execute, recording activity, branches and timings into `flow`.
    #[tracing::instrument(skip(self, graph, flow), fields(graph_id = graph.id()))]
    pub fn execute_with_flow_path(&self, graph: &Graph, flow: &mut FlowPath) -> Result<()> {
        graph.build_graph()?;
        let parallel = graph.configuration().is_parallel();
        tracing::debug!(parallel, "Starting graph execution");

        for (layer, ids) in graph.onion() {
            let nodes: Vec<&Node> = ids.iter().filter_map(|id| graph.node(*id)).collect();
            let batchable = nodes
                .iter()
                .all(|node| matches!(node.kind(), NodeKind::Operation(_) | NodeKind::Noop));

            let outcome = if parallel && batchable && nodes.len() > 1 {
                self.execute_layer_parallel(graph, &nodes, flow)
            } else {
                nodes
                    .iter()
                    .try_for_each(|node| self.execute_node(graph, node, flow))
            };

            if let Err(e) = outcome {
                tracing::error!(layer, error = %e, "Graph execution failed");
                return Err(e);
            }
        }

        tracing::debug!("Graph execution completed");
        Ok(())
    }

    /// Execute a single node: logic dispatch, skip test, body, commit.
    ///
    /// Logic executors call this for the members of a scope.
    pub fn execute_node(&self, graph: &Graph, node: &Node, flow: &mut FlowPath) -> Result<()> {
        let id = node.id();
        let started = Instant::now();

        if node.is_logic() {
            tracing::trace!(node_id = id, op = ?node.logic_op(), "Processing logic node");
            self.logic.process_node(self, graph, node, flow)?;
            flow.mark_executed(id);
            flow.set_outer_time(id, micros(started.elapsed()));
            return Ok(());
        }

        if self.should_skip(graph, node, flow) {
            tracing::trace!(node_id = id, "Skipping inactive node");
            flow.mark_active(id, false);
            return Ok(());
        }

        match node.kind() {
            NodeKind::Operation(op) => {
                let run = self.run_operation(graph, node, op.as_ref())?;
                self.commit(graph, node, run, flow)?;
            }
            NodeKind::Embedded(child) => {
                self.execute_embedded(graph, node, child)?;
                flow.set_inner_time(id, micros(started.elapsed()));
            }
            NodeKind::Noop | NodeKind::Logic(_) => {}
        }

        let outer = micros(started.elapsed());
        flow.mark_executed(id);
        flow.set_outer_time(id, outer);
        tracing::trace!(node_id = id, name = %node.display_name(), elapsed_us = outer, "Node executed");
        Ok(())
    }

    fn execute_layer_parallel(&self, graph: &Graph, nodes: &[&Node], flow: &mut FlowPath) -> Result<()> {
        let mut runnable = Vec::with_capacity(nodes.len());
        for node in nodes {
            if self.should_skip(graph, node, flow) {
                flow.mark_active(node.id(), false);
            } else {
                runnable.push(*node);
            }
        }

        let results = runnable
            .par_iter()
            .map(|node| -> Result<_> {
                let started = Instant::now();
                let run = match node.kind() {
                    NodeKind::Operation(op) => Some(self.run_operation(graph, node, op.as_ref())?),
                    _ => None,
                };
                Ok((*node, run, started))
            })
            .collect::<Result<Vec<_>>>()?;

        for (node, run, started) in results {
            if let Some(run) = run {
                self.commit(graph, node, run, flow)?;
            }
            flow.mark_executed(node.id());
            flow.set_outer_time(node.id(), micros(started.elapsed()));
        }
        Ok(())
    }

    /// A node is skipped when one of its scheduled producers is inactive or
    /// is a divergence point whose chosen branch differs from the edge slot.
    fn should_skip(&self, graph: &Graph, node: &Node, flow: &FlowPath) -> bool {
        node.inputs().iter().any(|input| {
            let Some(producer) = graph.node(input.node) else {
                return false;
            };
            if producer.layer().is_none() {
                return false;
            }
            !flow.is_active(input.node)
                || (producer.is_divergent() && flow.branch(input.node) != input.slot)
        })
    }

    fn run_operation(&self, graph: &Graph, node: &Node, op: &dyn Operation) -> Result<NodeRun> {
        let space = graph.variable_space();
        let mut ctx = Context::new(node, &space);

        let started = Instant::now();
        if let Err(e) = op.execute(&mut ctx) {
            tracing::error!(node_id = node.id(), op = %op.descriptor().name, error = %e, "Operation failed");
            return Err(e);
        }
        let inner = started.elapsed();

        let (outputs, branch) = ctx.into_parts();
        Ok(NodeRun {
            outputs,
            branch,
            inner,
        })
    }

    fn commit(&self, graph: &Graph, node: &Node, run: NodeRun, flow: &mut FlowPath) -> Result<()> {
        let id = node.id();
        {
            let mut space = graph.variable_space_mut();
            for (slot, value) in run.outputs {
                space.assign(VarId::new(id, slot), value)?;
            }

            let result = space
                .get(VarId::of(id))
                .map(|v| v.value().clone())
                .filter(|v| !v.is_empty());
            if let Some(result) = result {
                for out in node.outputs() {
                    if out.is_external() && space.has_variable(*out) {
                        space.assign(*out, result.clone())?;
                    }
                }
            }
        }

        flow.set_inner_time(id, micros(run.inner));
        if node.is_divergent() {
            let branch = run.branch.unwrap_or(0);
            flow.set_branch(id, branch);
            tracing::debug!(node_id = id, branch, "Divergence point chose branch");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::builtin::{Identity, Switch};
    use crate::tensor::Tensor;
    use crate::variable::Variable;

    fn graph_with_switch(predicate: f64) -> Graph {
        let mut graph = Graph::new(1);
        graph.add_variable(Variable::external(VarId::of(-1), Tensor::scalar(3.0)));
        graph.add_variable(Variable::external(VarId::of(-2), Tensor::scalar(predicate)));
        graph
            .add_node(
                Node::operation(1, Arc::new(Switch::new()))
                    .with_inputs(vec![VarId::of(-1), VarId::of(-2)]),
            )
            .unwrap();
        graph
            .add_node(Node::operation(2, Arc::new(Identity::new())).with_inputs(vec![VarId::new(1, 0)]))
            .unwrap();
        graph
            .add_node(Node::operation(3, Arc::new(Identity::new())).with_inputs(vec![VarId::new(1, 1)]))
            .unwrap();
        graph
    }

    #[test]
    fn test_false_branch() {
        let graph = graph_with_switch(0.0);
        let mut flow = FlowPath::new();
        GraphExecutioner::new()
            .execute_with_flow_path(&graph, &mut flow)
            .unwrap();

        assert_eq!(flow.branch(1), 0);
        assert!(flow.was_executed(2));
        assert!(!flow.is_active(3));
        assert!(!graph.variable_space().get(VarId::of(3)).unwrap().has_value());
    }

    #[test]
    fn test_true_branch() {
        let graph = graph_with_switch(1.0);
        let mut flow = FlowPath::new();
        GraphExecutioner::new()
            .execute_with_flow_path(&graph, &mut flow)
            .unwrap();

        assert_eq!(flow.branch(1), 1);
        assert!(!flow.is_active(2));
        assert_eq!(
            graph.variable_space().tensor(VarId::of(3)).unwrap().scalar_value(),
            Some(3.0)
        );
    }

    #[test]
    fn test_external_outputs_receive_result() {
        let mut graph = Graph::new(1);
        graph.add_variable(Variable::external(VarId::of(-1), Tensor::vector(vec![1.0, 2.0])));
        graph.add_variable(Variable::external(VarId::of(-5), Tensor::zeros(vec![2])));
        graph
            .add_node(
                Node::operation(1, Arc::new(Identity::new()))
                    .with_inputs(vec![VarId::of(-1)])
                    .with_outputs(vec![VarId::of(-5), VarId::of(-9)]),
            )
            .unwrap();

        GraphExecutioner::new().execute(&graph).unwrap();
        let space = graph.variable_space();
        assert_eq!(space.tensor(VarId::of(-5)).unwrap().data(), &[1.0, 2.0]);
        assert!(!space.has_variable(VarId::of(-9)));
    }

    #[test]
    fn test_missing_input_aborts() {
        let mut graph = Graph::new(1);
        graph
            .add_node(Node::operation(1, Arc::new(Identity::new())).with_inputs(vec![VarId::of(-1)]))
            .unwrap();
        let err = GraphExecutioner::new().execute(&graph).unwrap_err();
        assert_eq!(err.status(), crate::error::Status::BadInput);
    }
}
