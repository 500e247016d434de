//! Control operations every registry carries.

use super::{Context, OpDescriptor, OpRegistry, Operation};
use crate::error::{GraphError, Result};
use crate::node::Node;
use std::sync::Arc;

/// Forwards input 0 to output 0.
#[derive(Debug)]
pub struct Identity {
    descriptor: OpDescriptor,
}

impl Identity {
    pub fn new() -> Self {
        Self {
            descriptor: OpDescriptor::new("identity", 1, 1).inplace(),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation for Identity {
    fn descriptor(&self) -> &OpDescriptor {
        &self.descriptor
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Result<()> {
        let value = ctx.input(0)?.dup();
        ctx.set_output(0, value);
        Ok(())
    }
}

/// Routes input 0 to output slot 1 when the predicate (input 1) is non-zero,
/// to slot 0 otherwise. Consumers of the other slot are skipped.
#[derive(Debug)]
pub struct Switch {
    descriptor: OpDescriptor,
}

impl Switch {
    pub fn new() -> Self {
        Self {
            descriptor: OpDescriptor::new("switch", 2, 2).divergent(),
        }
    }
}

impl Default for Switch {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation for Switch {
    fn descriptor(&self) -> &OpDescriptor {
        &self.descriptor
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Result<()> {
        let value = ctx.input(0)?;
        let predicate = ctx.input(1)?.scalar_value().ok_or_else(|| {
            GraphError::bad_input(format!("switch {} got an empty predicate", ctx.node_id()))
        })?;

        let branch = i32::from(predicate != 0.0);
        ctx.set_output(branch, value.dup());
        ctx.set_branch(branch);
        Ok(())
    }

    fn output_shapes(&self, _node: &Node, input_shapes: &[Vec<usize>]) -> Result<Vec<Vec<usize>>> {
        let shape = input_shapes.first().cloned().unwrap_or_default();
        Ok(vec![shape.clone(), shape])
    }
}

pub(super) fn register_builtins(registry: &mut OpRegistry) {
    registry.register(Arc::new(Identity::new()));
    registry.register(Arc::new(Switch::new()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind};
    use crate::tensor::Tensor;
    use crate::variable::{VarId, VariableValue};
    use crate::variable_space::VariableSpace;
    use std::collections::BTreeMap;

    fn run(
        op: Arc<dyn Operation>,
        space: &VariableSpace,
        inputs: Vec<VarId>,
    ) -> (BTreeMap<i32, VariableValue>, Option<i32>) {
        let node = Node::new(5, NodeKind::Operation(op.clone())).with_inputs(inputs);
        let mut ctx = Context::new(&node, space);
        op.execute(&mut ctx).unwrap();
        ctx.into_parts()
    }

    #[test]
    fn test_identity_copies() {
        let mut space = VariableSpace::new();
        space.put_tensor(VarId::of(-1), Tensor::vector(vec![1.0, 2.0])).unwrap();

        let (outputs, branch) = run(Arc::new(Identity::new()), &space, vec![VarId::of(-1)]);
        assert_eq!(branch, None);
        assert_eq!(outputs[&0].as_tensor().unwrap().data(), &[1.0, 2.0]);
    }

    #[test]
    fn test_switch_selects_slot() {
        let mut space = VariableSpace::new();
        space.put_tensor(VarId::of(-1), Tensor::scalar(7.0)).unwrap();
        space.put_tensor(VarId::of(-2), Tensor::scalar(1.0)).unwrap();
        space.put_tensor(VarId::of(-3), Tensor::scalar(0.0)).unwrap();

        let (outputs, branch) = run(
            Arc::new(Switch::new()),
            &space,
            vec![VarId::of(-1), VarId::of(-2)],
        );
        assert_eq!(branch, Some(1));
        assert!(outputs.contains_key(&1));
        assert!(!outputs.contains_key(&0));

        let (outputs, branch) = run(
            Arc::new(Switch::new()),
            &space,
            vec![VarId::of(-1), VarId::of(-3)],
        );
        assert_eq!(branch, Some(0));
        assert_eq!(outputs[&0].as_tensor().unwrap().scalar_value(), Some(7.0));
    }

    #[test]
    fn test_switch_requires_predicate() {
        let mut space = VariableSpace::new();
        space.put_tensor(VarId::of(-1), Tensor::scalar(7.0)).unwrap();
        let node = Node::new(5, NodeKind::Operation(Arc::new(Switch::new())))
            .with_inputs(vec![VarId::of(-1)]);
        let mut ctx = Context::new(&node, &space);
        assert!(matches!(
            Switch::new().execute(&mut ctx),
            Err(GraphError::BadInput(_))
        ));
    }
}
