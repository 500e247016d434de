//! Execution of graphs embedded as single nodes of a parent graph.

use super::GraphExecutioner;
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::node::Node;
use crate::variable::{VarId, Variable, VariableValue};

impl GraphExecutioner {
    /// Feed the child's placeholders from the node's inputs, run the child,
    /// then move the child's outputs to `(node, 0..M-1)` in the parent.
    ///
    /// A named placeholder is looked up by name in the parent; an unnamed
    /// one takes the input at its position.
    pub(super) fn execute_embedded(&self, graph: &Graph, node: &Node, child: &Graph) -> Result<()> {
        let placeholders = child.placeholders();
        if placeholders.len() != node.inputs().len() {
            tracing::error!(
                node_id = node.id(),
                placeholders = placeholders.len(),
                inputs = node.inputs().len(),
                "Placeholder count mismatch"
            );
            return Err(GraphError::bad_input(format!(
                "embedded graph {} expects {} inputs, node {} supplies {}",
                child.id(),
                placeholders.len(),
                node.id(),
                node.inputs().len()
            )));
        }

        let feeds = {
            let parent = graph.variable_space();
            let inner = child.variable_space();
            placeholders
                .iter()
                .zip(node.inputs())
                .map(|(placeholder, input)| {
                    let name = inner.get(*placeholder).and_then(Variable::name);
                    let source = match name {
                        Some(name) => parent.get_by_name(name).ok_or_else(|| {
                            GraphError::bad_input(format!(
                                "placeholder '{}' has no matching variable in the parent graph",
                                name
                            ))
                        })?,
                        None => parent.get(*input).ok_or(GraphError::UnknownVariable(*input))?,
                    };
                    if !source.has_value() {
                        return Err(GraphError::bad_input(format!(
                            "variable {} feeding placeholder {} is empty",
                            source.id(),
                            placeholder
                        )));
                    }
                    Ok((*placeholder, source.value().clone()))
                })
                .collect::<Result<Vec<_>>>()?
        };

        {
            let mut inner = child.variable_space_mut();
            for (placeholder, value) in feeds {
                inner.assign(placeholder, value)?;
            }
        }

        self.execute(child)?;

        let outputs = child.outputs();
        let mut moved: Vec<(Option<String>, VariableValue)> = Vec::with_capacity(outputs.len());
        {
            let mut inner = child.variable_space_mut();
            for id in outputs {
                if let Some(variable) = inner.get_mut(id) {
                    moved.push((variable.name().map(str::to_string), variable.take_value()));
                }
            }
        }

        let migrated = moved.len();
        let mut parent = graph.variable_space_mut();
        for (slot, (name, value)) in moved.into_iter().enumerate() {
            let id = VarId::new(node.id(), slot as i32);
            let name = name.or_else(|| parent.get(id).and_then(Variable::name).map(str::to_string));
            let mut variable = Variable::new(id).with_value(value).with_removable(true);
            if let Some(name) = name {
                variable = variable.with_name(name);
            }
            parent.put_variable(variable);
        }

        tracing::debug!(node_id = node.id(), child_id = child.id(), migrated, "Embedded graph outputs migrated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use crate::ops::builtin::Identity;
    use crate::tensor::Tensor;
    use std::sync::Arc;

    fn child() -> Graph {
        let mut child = Graph::new(20);
        child.add_variable(Variable::placeholder(VarId::of(-1)));
        child
            .add_node(Node::operation(1, Arc::new(Identity::new())).with_inputs(vec![VarId::of(-1)]))
            .unwrap();
        child
    }

    #[test]
    fn test_positional_feed_and_migration() {
        let mut graph = Graph::new(1);
        graph.add_variable(Variable::external(VarId::of(-1), Tensor::vector(vec![4.0, 5.0])));
        graph
            .add_node(
                Node::new(1, NodeKind::Embedded(Box::new(child())))
                    .with_name("inner")
                    .with_inputs(vec![VarId::of(-1)]),
            )
            .unwrap();

        GraphExecutioner::new().execute(&graph).unwrap();

        let space = graph.variable_space();
        let out = space.get(VarId::of(1)).unwrap();
        assert_eq!(out.tensor().unwrap().data(), &[4.0, 5.0]);
        assert!(out.is_removable());
        assert_eq!(out.name(), Some("inner"));
    }

    #[test]
    fn test_count_mismatch_runs_nothing() {
        let mut graph = Graph::new(1);
        graph
            .add_node(
                Node::new(1, NodeKind::Embedded(Box::new(child())))
                    .with_inputs(vec![VarId::of(-1), VarId::of(-2)]),
            )
            .unwrap();

        let err = GraphExecutioner::new().execute(&graph).unwrap_err();
        assert!(matches!(err, GraphError::BadInput(_)));
        let Some(NodeKind::Embedded(inner)) = graph.node(1).map(Node::kind) else {
            panic!("embedded node expected");
        };
        assert!(!inner.variable_space().get(VarId::of(1)).unwrap().has_value());
    }
}
