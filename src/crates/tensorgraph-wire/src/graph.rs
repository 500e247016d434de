//! Graph records: the flat, serializable description of a computation graph.
//!
//! A [`FlatGraph`] is what travels between processes. It lists variables
//! (externally supplied arrays and placeholders, always with negative node
//! ids), nodes (positive ids) and an optional explicit output list. Nothing
//! here knows about scheduling; the core crate turns a `FlatGraph` into an
//! executable graph.
//!
//! All records derive serde so they can be written as framed bincode (see
//! [`crate::codec`]), as JSON, or as YAML descriptors for tests and tooling.
//! Fields are never skipped on serialization: bincode is not self-describing,
//! so every field must be present in the byte stream.

use crate::error::{Result, WireError};
use crate::types::{ByteOrder, DataType, ExecutionMode, OpType, OutputMode};
use serde::{Deserialize, Serialize};

/// `(node, slot)` pair addressing one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntPair {
    pub first: i32,
    #[serde(default)]
    pub second: i32,
}

impl IntPair {
    pub fn new(first: i32, second: i32) -> Self {
        Self { first, second }
    }
}

impl From<i32> for IntPair {
    fn from(first: i32) -> Self {
        Self { first, second: 0 }
    }
}

/// Pair of 64-bit values, used for `(outer, inner)` timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LongPair {
    pub first: i64,
    pub second: i64,
}

impl LongPair {
    pub fn new(first: i64, second: i64) -> Self {
        Self { first, second }
    }
}

/// Serialized tensor payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlatArray {
    pub shape: Vec<i64>,
    #[serde(default)]
    pub buffer: Vec<u8>,
    #[serde(default)]
    pub dtype: DataType,
    #[serde(default)]
    pub byte_order: ByteOrder,
}

impl FlatArray {
    pub fn new(shape: Vec<i64>, buffer: Vec<u8>, dtype: DataType, byte_order: ByteOrder) -> Self {
        Self {
            shape,
            buffer,
            dtype,
            byte_order,
        }
    }

    /// Number of elements described by the shape. An empty shape is a scalar.
    /// `None` when a dimension is negative or the product does not fit `usize`.
    pub fn length(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |acc, d| {
            usize::try_from(*d).ok().and_then(|d| acc.checked_mul(d))
        })
    }

    /// Check that the payload holds exactly `length * size_of(dtype)` bytes.
    pub fn validate(&self) -> Result<()> {
        if let Some(d) = self.shape.iter().find(|d| **d < 0) {
            return Err(WireError::Invalid(format!(
                "negative dimension {} in shape {:?}",
                d, self.shape
            )));
        }
        let needed = self
            .length()
            .and_then(|length| length.checked_mul(self.dtype.size_of()))
            .ok_or_else(|| {
                WireError::Invalid(format!(
                    "array of shape {:?} ({:?}) exceeds the addressable size",
                    self.shape, self.dtype
                ))
            })?;
        if self.buffer.len() != needed {
            return Err(WireError::Invalid(format!(
                "array of shape {:?} ({:?}) needs {} bytes, buffer has {}",
                self.shape,
                self.dtype,
                needed,
                self.buffer.len()
            )));
        }
        Ok(())
    }
}

/// Variable record. Without an array the variable is a placeholder that the
/// caller (or an enclosing graph) must fill before execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatVariable {
    pub id: IntPair,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub array: Option<FlatArray>,
}

impl FlatVariable {
    pub fn new(id: IntPair) -> Self {
        Self {
            id,
            name: None,
            array: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_array(mut self, array: FlatArray) -> Self {
        self.array = Some(array);
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.array.is_none()
    }
}

/// Per-graph execution settings carried inside the graph record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatConfiguration {
    #[serde(default)]
    pub output_mode: OutputMode,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: u64,
    #[serde(default = "default_build_budget_factor")]
    pub build_budget_factor: u32,
}

fn default_max_loop_iterations() -> u64 {
    10_000_000
}

fn default_build_budget_factor() -> u32 {
    2
}

impl Default for FlatConfiguration {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::default(),
            execution_mode: ExecutionMode::default(),
            max_loop_iterations: default_max_loop_iterations(),
            build_budget_factor: default_build_budget_factor(),
        }
    }
}

/// Node record.
///
/// Inputs may be given either as bare producer ids (`inputs`, slot 0) or as
/// explicit `(node, slot)` pairs (`input_paired`). When both are present the
/// paired form wins. Outputs follow the same rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatNode {
    pub id: i32,
    #[serde(default)]
    pub name: Option<String>,
    pub op_type: OpType,
    #[serde(default)]
    pub op_num: i64,
    #[serde(default)]
    pub inputs: Vec<i32>,
    #[serde(default)]
    pub input_paired: Vec<IntPair>,
    #[serde(default)]
    pub outputs: Vec<i32>,
    #[serde(default)]
    pub output_paired: Vec<IntPair>,
    #[serde(default)]
    pub extra_params: Vec<f64>,
    #[serde(default)]
    pub extra_integer: Vec<i64>,
    #[serde(default)]
    pub dimensions: Vec<i32>,
    #[serde(default)]
    pub scalar: f32,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub scope_id: i32,
    #[serde(default)]
    pub scope_name: Option<String>,
    #[serde(default)]
    pub embedded: Option<Box<FlatGraph>>,
}

impl FlatNode {
    pub fn new(id: i32, op_type: OpType, op_num: i64) -> Self {
        Self {
            id,
            name: None,
            op_type,
            op_num,
            inputs: Vec::new(),
            input_paired: Vec::new(),
            outputs: Vec::new(),
            output_paired: Vec::new(),
            extra_params: Vec::new(),
            extra_integer: Vec::new(),
            dimensions: Vec::new(),
            scalar: 0.0,
            data_type: DataType::default(),
            scope_id: 0,
            scope_name: None,
            embedded: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bare producer ids; each edge reads slot 0.
    pub fn with_inputs(mut self, inputs: Vec<i32>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_inputs_paired(mut self, inputs: Vec<IntPair>) -> Self {
        self.input_paired = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<i32>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_outputs_paired(mut self, outputs: Vec<IntPair>) -> Self {
        self.output_paired = outputs;
        self
    }

    pub fn with_float_args(mut self, args: Vec<f64>) -> Self {
        self.extra_params = args;
        self
    }

    pub fn with_int_args(mut self, args: Vec<i64>) -> Self {
        self.extra_integer = args;
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

    pub fn with_scope(mut self, scope_id: i32, scope_name: impl Into<String>) -> Self {
        self.scope_id = scope_id;
        self.scope_name = Some(scope_name.into());
        self
    }

    pub fn with_embedded(mut self, graph: FlatGraph) -> Self {
        self.embedded = Some(Box::new(graph));
        self
    }

    /// Input edges in normalized `(node, slot)` form.
    pub fn input_pairs(&self) -> Vec<IntPair> {
        if !self.input_paired.is_empty() {
            self.input_paired.clone()
        } else {
            self.inputs.iter().copied().map(IntPair::from).collect()
        }
    }

    /// Output edges in normalized `(node, slot)` form.
    pub fn output_pairs(&self) -> Vec<IntPair> {
        if !self.output_paired.is_empty() {
            self.output_paired.clone()
        } else {
            self.outputs.iter().copied().map(IntPair::from).collect()
        }
    }
}

/// Complete graph record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlatGraph {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub variables: Vec<FlatVariable>,
    #[serde(default)]
    pub nodes: Vec<FlatNode>,
    #[serde(default)]
    pub outputs: Vec<IntPair>,
    #[serde(default)]
    pub configuration: Option<FlatConfiguration>,
}

impl FlatGraph {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_variable(mut self, variable: FlatVariable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_node(mut self, node: FlatNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<IntPair>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_configuration(mut self, configuration: FlatConfiguration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Structural checks that do not need an operation registry: array
    /// payload sizes (recursively through embedded graphs), variable ids
    /// below zero and node ids above zero.
    pub fn validate(&self) -> Result<()> {
        for variable in &self.variables {
            if variable.id.first >= 0 {
                return Err(WireError::Invalid(format!(
                    "variable {:?} must use a negative node id",
                    variable.id
                )));
            }
            if let Some(array) = &variable.array {
                array.validate()?;
            }
        }
        for node in &self.nodes {
            if node.id <= 0 {
                return Err(WireError::Invalid(format!(
                    "node id {} must be positive",
                    node.id
                )));
            }
            if let Some(embedded) = &node.embedded {
                embedded.validate()?;
            }
        }
        Ok(())
    }
}
