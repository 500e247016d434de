//! Graph nodes.

use crate::graph::Graph;
use crate::ops::Operation;
use crate::variable::VarId;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tensorgraph_wire::{DataType, OpType};

/// Control-flow operations executed by the logic executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOp {
    While,
    Scope,
    Conditional,
    Switch,
    Return,
    Expose,
    Merge,
    LoopCond,
    NextIteration,
    Exit,
    Enter,
}

impl LogicOp {
    pub fn code(self) -> i64 {
        match self {
            LogicOp::While => 0,
            LogicOp::Scope => 10,
            LogicOp::Conditional => 20,
            LogicOp::Switch => 30,
            LogicOp::Return => 40,
            LogicOp::Expose => 50,
            LogicOp::Merge => 60,
            LogicOp::LoopCond => 70,
            LogicOp::NextIteration => 80,
            LogicOp::Exit => 90,
            LogicOp::Enter => 100,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        let op = match code {
            0 => LogicOp::While,
            10 => LogicOp::Scope,
            20 => LogicOp::Conditional,
            30 => LogicOp::Switch,
            40 => LogicOp::Return,
            50 => LogicOp::Expose,
            60 => LogicOp::Merge,
            70 => LogicOp::LoopCond,
            80 => LogicOp::NextIteration,
            90 => LogicOp::Exit,
            100 => LogicOp::Enter,
            _ => return None,
        };
        Some(op)
    }
}

/// What a node does when executed.
pub enum NodeKind {
    /// Regular operation resolved from the registry
    Operation(Arc<dyn Operation>),
    /// Control flow handled by the logic executor
    Logic(LogicOp),
    /// Nested graph executed with this node's inputs as placeholders
    Embedded(Box<Graph>),
    /// Declares a variable, does nothing at run time
    Noop,
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Operation(op) => write!(f, "Operation({})", op.descriptor().name),
            NodeKind::Logic(op) => write!(f, "Logic({:?})", op),
            NodeKind::Embedded(graph) => write!(f, "Embedded(graph {})", graph.id()),
            NodeKind::Noop => f.write_str("Noop"),
        }
    }
}

/// One vertex of the dataflow graph.
///
/// A node's layer is assigned exactly once, when the scheduler places it in
/// the onion. Attempting to move an already placed node is a scheduler bug
/// and panics.
#[derive(Debug)]
pub struct Node {
    id: i32,
    name: Option<String>,
    op_type: OpType,
    op_num: i64,
    kind: NodeKind,
    inputs: Vec<VarId>,
    outputs: Vec<VarId>,
    int_args: Vec<i64>,
    float_args: Vec<f64>,
    dimensions: Vec<i32>,
    scalar: f32,
    data_type: DataType,
    inplace: bool,
    divergent: bool,
    scope_id: i32,
    scope_name: Option<String>,
    layer: OnceLock<usize>,
}

impl Node {
    pub fn new(id: i32, kind: NodeKind) -> Self {
        let (op_type, op_num, inplace, divergent) = match &kind {
            NodeKind::Operation(op) => {
                let d = op.descriptor();
                (OpType::Custom, d.hash, d.inplace_allowed, d.divergent)
            }
            NodeKind::Logic(op) => (OpType::Logic, op.code(), false, false),
            NodeKind::Embedded(_) => (OpType::Graph, 0, false, false),
            NodeKind::Noop => (OpType::Variable, 0, false, false),
        };
        Self {
            id,
            name: None,
            op_type,
            op_num,
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            int_args: Vec::new(),
            float_args: Vec::new(),
            dimensions: Vec::new(),
            scalar: 0.0,
            data_type: DataType::default(),
            inplace,
            divergent,
            scope_id: 0,
            scope_name: None,
            layer: OnceLock::new(),
        }
    }

    /// Shorthand for an operation node.
    pub fn operation(id: i32, op: Arc<dyn Operation>) -> Self {
        Self::new(id, NodeKind::Operation(op))
    }

    /// Shorthand for a logic node.
    pub fn logic(id: i32, op: LogicOp) -> Self {
        Self::new(id, NodeKind::Logic(op))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Record the serialized type tag and number this node was decoded from.
    pub fn with_op(mut self, op_type: OpType, op_num: i64) -> Self {
        self.op_type = op_type;
        self.op_num = op_num;
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<VarId>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<VarId>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_int_args(mut self, args: Vec<i64>) -> Self {
        self.int_args = args;
        self
    }

    pub fn with_float_args(mut self, args: Vec<f64>) -> Self {
        self.float_args = args;
        self
    }

    pub fn with_dimensions(mut self, dimensions: Vec<i32>) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_scalar(mut self, scalar: f32) -> Self {
        self.scalar = scalar;
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_inplace(mut self, inplace: bool) -> Self {
        self.inplace = inplace || self.divergent;
        self
    }

    /// Place the node inside the scope declared by logic node `scope_id`.
    pub fn with_scope(mut self, scope_id: i32, scope_name: Option<String>) -> Self {
        self.scope_id = scope_id;
        self.scope_name = scope_name;
        self
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name, or the id when the node is anonymous
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("#{}", self.id))
    }

    pub fn op_type(&self) -> OpType {
        self.op_type
    }

    pub fn op_num(&self) -> i64 {
        self.op_num
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[VarId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[VarId] {
        &self.outputs
    }

    pub fn int_args(&self) -> &[i64] {
        &self.int_args
    }

    pub fn float_args(&self) -> &[f64] {
        &self.float_args
    }

    pub fn dimensions(&self) -> &[i32] {
        &self.dimensions
    }

    pub fn scalar(&self) -> f32 {
        self.scalar
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_inplace(&self) -> bool {
        self.inplace
    }

    pub fn is_divergent(&self) -> bool {
        self.divergent
    }

    pub fn scope_id(&self) -> i32 {
        self.scope_id
    }

    pub fn scope_name(&self) -> Option<&str> {
        self.scope_name.as_deref()
    }

    pub fn is_scoped(&self) -> bool {
        self.scope_id != 0
    }

    pub fn operation_ref(&self) -> Option<&Arc<dyn Operation>> {
        match &self.kind {
            NodeKind::Operation(op) => Some(op),
            _ => None,
        }
    }

    pub fn logic_op(&self) -> Option<LogicOp> {
        match self.kind {
            NodeKind::Logic(op) => Some(op),
            _ => None,
        }
    }

    pub fn is_logic(&self) -> bool {
        matches!(self.kind, NodeKind::Logic(_))
    }

    pub fn embedded(&self) -> Option<&Graph> {
        match &self.kind {
            NodeKind::Embedded(graph) => Some(graph),
            _ => None,
        }
    }

    /// Number of output slots the node declares.
    pub fn num_outputs(&self) -> usize {
        match &self.kind {
            NodeKind::Operation(op) => op.descriptor().num_outputs.max(1),
            _ => 1,
        }
    }

    pub fn layer(&self) -> Option<usize> {
        self.layer.get().copied()
    }

    /// Fix the node's layer.
    ///
    /// # Panics
    ///
    /// If the node was already placed on a different layer.
    pub(crate) fn set_layer(&self, layer: usize) {
        let placed = *self.layer.get_or_init(|| layer);
        assert_eq!(
            placed, layer,
            "node {} already placed on layer {}, cannot move to {}",
            self.id, placed, layer
        );
    }

    /// True when every input is produced outside the graph. A node without
    /// inputs counts as all-external.
    pub fn has_only_external_inputs(&self) -> bool {
        self.inputs.iter().all(VarId::is_external)
    }
}
