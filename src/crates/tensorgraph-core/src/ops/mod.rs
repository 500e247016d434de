//! Operation contract and registry.
//!
//! Numeric kernels live outside the engine. The engine only needs to know,
//! for each node, which [`Operation`] implements it, how many inputs and
//! outputs it declares, and whether it is a divergence point. An operation
//! reads its inputs through a [`Context`] that borrows the graph's
//! [`VariableSpace`] and hands its outputs back through the same context;
//! the executioner commits them once the body returns.
//!
//! ```rust
//! use tensorgraph_core::ops::{Context, OpDescriptor, Operation};
//! use tensorgraph_core::Result;
//!
//! #[derive(Debug)]
//! struct Negate(OpDescriptor);
//!
//! impl Operation for Negate {
//!     fn descriptor(&self) -> &OpDescriptor {
//!         &self.0
//!     }
//!
//!     fn execute(&self, ctx: &mut Context<'_>) -> Result<()> {
//!         let out = ctx.input(0)?.map(|v| -v);
//!         ctx.set_output(0, out);
//!         Ok(())
//!     }
//! }
//!
//! let negate = Negate(OpDescriptor::new("negate", 1, 1));
//! assert_eq!(negate.descriptor().num_outputs, 1);
//! ```

pub mod builtin;

use crate::error::{GraphError, Result};
use crate::node::Node;
use crate::tensor::{Tensor, TensorList};
use crate::variable::{VarId, VariableValue};
use crate::variable_space::VariableSpace;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tensorgraph_wire::OpType;

/// Static description of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpDescriptor {
    pub name: String,
    /// Stable 64-bit key used by serialized graphs to refer to custom ops
    pub hash: i64,
    /// Declared input count, `-1` for variadic
    pub num_inputs: i32,
    pub num_outputs: usize,
    pub divergent: bool,
    pub inplace_allowed: bool,
}

impl OpDescriptor {
    pub fn new(name: impl Into<String>, num_inputs: i32, num_outputs: usize) -> Self {
        let name = name.into();
        let hash = op_hash(&name);
        Self {
            name,
            hash,
            num_inputs,
            num_outputs,
            divergent: false,
            inplace_allowed: false,
        }
    }

    pub fn with_hash(mut self, hash: i64) -> Self {
        self.hash = hash;
        self
    }

    /// Mark as a divergence point. Divergent operations are always inplace.
    pub fn divergent(mut self) -> Self {
        self.divergent = true;
        self.inplace_allowed = true;
        self
    }

    pub fn inplace(mut self) -> Self {
        self.inplace_allowed = true;
        self
    }

    pub fn is_variadic(&self) -> bool {
        self.num_inputs < 0
    }
}

/// FNV-1a over the operation name, reinterpreted as signed.
pub fn op_hash(name: &str) -> i64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash as i64
}

/// Implementation of one node kind.
pub trait Operation: Send + Sync + fmt::Debug {
    fn descriptor(&self) -> &OpDescriptor;

    /// Run the body. Outputs go through [`Context::set_output`]; divergent
    /// operations report their branch through [`Context::set_branch`].
    fn execute(&self, ctx: &mut Context<'_>) -> Result<()>;

    /// Output shapes for the given input shapes, used by memory estimation.
    /// Defaults to one output shaped like the first input.
    fn output_shapes(&self, _node: &Node, input_shapes: &[Vec<usize>]) -> Result<Vec<Vec<usize>>> {
        Ok(vec![input_shapes.first().cloned().unwrap_or_default()])
    }
}

/// View of one node's inputs and sink for its outputs.
pub struct Context<'a> {
    node: &'a Node,
    space: &'a VariableSpace,
    outputs: BTreeMap<i32, VariableValue>,
    branch: Option<i32>,
}

impl<'a> Context<'a> {
    pub fn new(node: &'a Node, space: &'a VariableSpace) -> Self {
        Self {
            node,
            space,
            outputs: BTreeMap::new(),
            branch: None,
        }
    }

    pub fn node(&self) -> &Node {
        self.node
    }

    pub fn node_id(&self) -> i32 {
        self.node.id()
    }

    pub fn num_inputs(&self) -> usize {
        self.node.inputs().len()
    }

    fn input_id(&self, index: usize) -> Result<VarId> {
        self.node.inputs().get(index).copied().ok_or_else(|| {
            GraphError::bad_input(format!(
                "node {} has {} inputs, asked for #{}",
                self.node.id(),
                self.node.inputs().len(),
                index
            ))
        })
    }

    /// Tensor bound to input edge `index`.
    pub fn input(&self, index: usize) -> Result<&'a Tensor> {
        let id = self.input_id(index)?;
        self.space.tensor(id)
    }

    /// Tensor list bound to input edge `index`.
    pub fn input_list(&self, index: usize) -> Result<&'a TensorList> {
        let id = self.input_id(index)?;
        let variable = self.space.get(id).ok_or(GraphError::UnknownVariable(id))?;
        variable
            .list()
            .ok_or_else(|| GraphError::bad_input(format!("variable {} holds no list", id)))
    }

    /// All inputs as tensors, in edge order.
    pub fn inputs(&self) -> Result<Vec<&'a Tensor>> {
        (0..self.num_inputs()).map(|i| self.input(i)).collect()
    }

    pub fn int_args(&self) -> &[i64] {
        self.node.int_args()
    }

    pub fn int_arg(&self, index: usize) -> Result<i64> {
        self.node.int_args().get(index).copied().ok_or_else(|| {
            GraphError::bad_params(format!("node {} lacks integer argument #{}", self.node.id(), index))
        })
    }

    pub fn float_args(&self) -> &[f64] {
        self.node.float_args()
    }

    pub fn float_arg(&self, index: usize) -> Result<f64> {
        self.node.float_args().get(index).copied().ok_or_else(|| {
            GraphError::bad_params(format!("node {} lacks float argument #{}", self.node.id(), index))
        })
    }

    pub fn dimensions(&self) -> &[i32] {
        self.node.dimensions()
    }

    pub fn scalar_arg(&self) -> f32 {
        self.node.scalar()
    }

    pub fn set_output(&mut self, slot: i32, tensor: Tensor) {
        self.outputs.insert(slot, VariableValue::Tensor(tensor));
    }

    pub fn set_output_list(&mut self, slot: i32, list: TensorList) {
        self.outputs.insert(slot, VariableValue::List(list));
    }

    /// Branch chosen by a divergent operation.
    pub fn set_branch(&mut self, branch: i32) {
        self.branch = Some(branch);
    }

    pub fn branch(&self) -> Option<i32> {
        self.branch
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<i32, VariableValue>, Option<i32>) {
        (self.outputs, self.branch)
    }
}

/// Resolves serialized `(op type, op number)` pairs to operations.
///
/// Custom operations are keyed by their descriptor hash; legacy families
/// (transform, scalar, pairwise, reductions, random) by family and number.
#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    custom: HashMap<i64, Arc<dyn Operation>>,
    legacy: HashMap<(OpType, i64), Arc<dyn Operation>>,
}

impl OpRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in control operations
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    /// Register a custom operation under its descriptor hash.
    pub fn register(&mut self, op: Arc<dyn Operation>) -> &mut Self {
        self.custom.insert(op.descriptor().hash, op);
        self
    }

    /// Register an operation for a legacy family number.
    pub fn register_legacy(&mut self, op_type: OpType, op_num: i64, op: Arc<dyn Operation>) -> &mut Self {
        self.legacy.insert((op_type, op_num), op);
        self
    }

    pub fn resolve(&self, op_type: OpType, op_num: i64) -> Result<Arc<dyn Operation>> {
        let found = if op_type.is_legacy() {
            self.legacy.get(&(op_type, op_num))
        } else {
            self.custom
                .get(&op_num)
                .or_else(|| self.legacy.get(&(op_type, op_num)))
        };
        found
            .cloned()
            .ok_or(GraphError::UnknownOperation { op_type, op_num })
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.custom.get(&op_hash(name)).cloned()
    }

    pub fn len(&self) -> usize {
        self.custom.len() + self.legacy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.custom.is_empty() && self.legacy.is_empty()
    }
}
