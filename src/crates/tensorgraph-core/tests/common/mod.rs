//! Small numeric operations shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use tensorgraph_core::{
    Context, GraphError, Node, OpDescriptor, OpRegistry, Operation, Result, Tensor, VarId,
};

/// Elementwise sum of two inputs (scalars broadcast)
#[derive(Debug)]
pub struct Add(OpDescriptor);

impl Add {
    pub fn new() -> Self {
        Self(OpDescriptor::new("add", 2, 1))
    }
}

impl Operation for Add {
    fn descriptor(&self) -> &OpDescriptor {
        &self.0
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Result<()> {
        let out = ctx.input(0)?.zip_with(ctx.input(1)?, |a, b| a + b)?;
        ctx.set_output(0, out);
        Ok(())
    }
}

/// Elementwise product of two inputs
#[derive(Debug)]
pub struct Multiply(OpDescriptor);

impl Multiply {
    pub fn new() -> Self {
        Self(OpDescriptor::new("multiply", 2, 1))
    }
}

impl Operation for Multiply {
    fn descriptor(&self) -> &OpDescriptor {
        &self.0
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Result<()> {
        let out = ctx.input(0)?.zip_with(ctx.input(1)?, |a, b| a * b)?;
        ctx.set_output(0, out);
        Ok(())
    }
}

/// Adds the node's scalar argument to every element
#[derive(Debug)]
pub struct AddScalar(OpDescriptor);

impl AddScalar {
    pub fn new() -> Self {
        Self(OpDescriptor::new("add_scalar", 1, 1))
    }
}

impl Operation for AddScalar {
    fn descriptor(&self) -> &OpDescriptor {
        &self.0
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Result<()> {
        let scalar = f64::from(ctx.scalar_arg());
        let out = ctx.input(0)?.map(|v| v + scalar);
        ctx.set_output(0, out);
        Ok(())
    }
}

/// 1.0 when the first element of input 0 is below the first float argument
#[derive(Debug)]
pub struct LessThan(OpDescriptor);

impl LessThan {
    pub fn new() -> Self {
        Self(OpDescriptor::new("less_than", 1, 1))
    }
}

impl Operation for LessThan {
    fn descriptor(&self) -> &OpDescriptor {
        &self.0
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Result<()> {
        let limit = ctx.float_arg(0)?;
        let value = ctx
            .input(0)?
            .scalar_value()
            .ok_or_else(|| GraphError::bad_input("empty operand"))?;
        ctx.set_output(0, Tensor::scalar(if value < limit { 1.0 } else { 0.0 }));
        Ok(())
    }

    fn output_shapes(&self, _node: &Node, _input_shapes: &[Vec<usize>]) -> Result<Vec<Vec<usize>>> {
        Ok(vec![Vec::new()])
    }
}

/// Always fails
#[derive(Debug)]
pub struct Broken(OpDescriptor);

impl Broken {
    pub fn new() -> Self {
        Self(OpDescriptor::new("broken", 1, 1))
    }
}

impl Operation for Broken {
    fn descriptor(&self) -> &OpDescriptor {
        &self.0
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Result<()> {
        Err(GraphError::kernel_failure(ctx.node_id(), "broken on purpose"))
    }
}

/// Registry with the builtins and every test operation
pub fn registry() -> OpRegistry {
    let mut registry = OpRegistry::with_builtins();
    registry
        .register(Arc::new(Add::new()))
        .register(Arc::new(Multiply::new()))
        .register(Arc::new(AddScalar::new()))
        .register(Arc::new(LessThan::new()))
        .register(Arc::new(Broken::new()));
    registry
}

pub fn op(registry: &OpRegistry, id: i32, name: &str, inputs: &[VarId]) -> Node {
    let operation = registry
        .by_name(name)
        .unwrap_or_else(|| panic!("operation {} not registered", name));
    Node::operation(id, operation).with_inputs(inputs.to_vec())
}

/// Slot-0 ids
pub fn ids(nodes: &[i32]) -> Vec<VarId> {
    nodes.iter().map(|n| VarId::of(*n)).collect()
}
