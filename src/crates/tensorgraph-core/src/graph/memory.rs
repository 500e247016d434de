//! Memory estimation by shape propagation.

use super::Graph;
use crate::error::Result;
use crate::node::{LogicOp, NodeKind};
use crate::variable::VarId;
use std::collections::HashMap;

impl Graph {
    /// Estimate the bytes the graph's node outputs will occupy.
    ///
    /// Walks the onion in order. Shapes of external inputs come from the
    /// variable space, shapes of internal inputs from earlier estimates, and
    /// each operation maps them to output shapes through
    /// [`Operation::output_shapes`](crate::ops::Operation::output_shapes).
    /// Outputs of inplace nodes reuse their input buffer and are not counted.
    /// Embedded graphs contribute their own estimate.
    pub fn estimate_required_memory(&self) -> Result<usize> {
        self.build_graph()?;

        let mut shapes: HashMap<VarId, Vec<usize>> = HashMap::new();
        let mut total = 0usize;
        let space = self.variable_space();

        for id in self.layers().into_iter().flatten() {
            let Some(node) = self.node(id) else {
                continue;
            };

            let input_shapes: Vec<Vec<usize>> = node
                .inputs()
                .iter()
                .filter_map(|input| {
                    shapes.get(input).cloned().or_else(|| {
                        space
                            .get(*input)
                            .and_then(|v| v.tensor())
                            .map(|t| t.shape().to_vec())
                    })
                })
                .collect();

            match node.kind() {
                NodeKind::Operation(op) => {
                    let outputs = op.output_shapes(node, &input_shapes)?;
                    for (slot, shape) in outputs.into_iter().enumerate() {
                        if !node.is_inplace() {
                            let elements: usize = shape.iter().product();
                            total += elements * node.data_type().size_of();
                        }
                        shapes.insert(VarId::new(id, slot as i32), shape);
                    }
                }
                NodeKind::Logic(LogicOp::Expose | LogicOp::Merge) => {
                    if let Some(shape) = input_shapes.into_iter().next() {
                        shapes.insert(VarId::of(id), shape);
                    }
                }
                NodeKind::Embedded(child) => {
                    total += child.estimate_required_memory()?;
                }
                NodeKind::Logic(_) | NodeKind::Noop => {}
            }
        }

        tracing::debug!(graph_id = self.id(), bytes = total, "Estimated required memory");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::ops::builtin::{Identity, Switch};
    use crate::tensor::Tensor;
    use crate::variable::Variable;
    use std::sync::Arc;

    #[test]
    fn test_inplace_outputs_are_free() {
        let mut graph = Graph::new(1);
        graph.add_variable(Variable::external(VarId::of(-1), Tensor::zeros(vec![2, 3])));
        graph.add_variable(Variable::external(VarId::of(-2), Tensor::scalar(1.0)));

        // copy: 6 floats
        graph
            .add_node(
                Node::operation(1, Arc::new(Identity::new()))
                    .with_inplace(false)
                    .with_inputs(vec![VarId::of(-1)]),
            )
            .unwrap();
        // inplace identity: free
        graph
            .add_node(Node::operation(2, Arc::new(Identity::new())).with_inputs(vec![VarId::of(1)]))
            .unwrap();
        // divergent, always inplace: free
        graph
            .add_node(
                Node::operation(3, Arc::new(Switch::new()))
                    .with_inputs(vec![VarId::of(2), VarId::of(-2)]),
            )
            .unwrap();

        assert_eq!(graph.estimate_required_memory().unwrap(), 6 * 4);
    }
}
