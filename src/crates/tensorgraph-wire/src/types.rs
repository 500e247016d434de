//! Enumerations shared by graph and result records.
//!
//! Every enum carries a stable numeric code (`code()` / `from_code()`) in
//! addition to its serde representation, so tooling that only sees raw
//! integers (op numbers, dtype tags in foreign buffers) can still map them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation family a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    Transform,
    Accumulation,
    IndexAccumulation,
    Scalar,
    Broadcast,
    Pairwise,
    Accumulation3,
    SummaryStats,
    Shape,
    Aggregation,
    Random,
    Custom,
    Graph,
    Variable,
    Boolean,
    Logic,
}

impl OpType {
    pub fn code(self) -> i32 {
        match self {
            OpType::Transform => 0,
            OpType::Accumulation => 1,
            OpType::IndexAccumulation => 2,
            OpType::Scalar => 3,
            OpType::Broadcast => 4,
            OpType::Pairwise => 5,
            OpType::Accumulation3 => 6,
            OpType::SummaryStats => 7,
            OpType::Shape => 8,
            OpType::Aggregation => 9,
            OpType::Random => 10,
            OpType::Custom => 11,
            OpType::Graph => 12,
            OpType::Variable => 30,
            OpType::Boolean => 40,
            OpType::Logic => 119,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        let op_type = match code {
            0 => OpType::Transform,
            1 => OpType::Accumulation,
            2 => OpType::IndexAccumulation,
            3 => OpType::Scalar,
            4 => OpType::Broadcast,
            5 => OpType::Pairwise,
            6 => OpType::Accumulation3,
            7 => OpType::SummaryStats,
            8 => OpType::Shape,
            9 => OpType::Aggregation,
            10 => OpType::Random,
            11 => OpType::Custom,
            12 => OpType::Graph,
            30 => OpType::Variable,
            40 => OpType::Boolean,
            119 => OpType::Logic,
            _ => return None,
        };
        Some(op_type)
    }

    /// Legacy op families: executed by a fixed kernel picked by `(type, num)`.
    pub fn is_legacy(self) -> bool {
        matches!(
            self,
            OpType::Transform
                | OpType::Accumulation
                | OpType::IndexAccumulation
                | OpType::Scalar
                | OpType::Broadcast
                | OpType::Pairwise
                | OpType::Accumulation3
                | OpType::SummaryStats
                | OpType::Random
        )
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpType::Transform => "TRANSFORM",
            OpType::Accumulation => "ACCUMULATION",
            OpType::IndexAccumulation => "INDEX_ACCUMULATION",
            OpType::Scalar => "SCALAR",
            OpType::Broadcast => "BROADCAST",
            OpType::Pairwise => "PAIRWISE",
            OpType::Accumulation3 => "ACCUMULATION3",
            OpType::SummaryStats => "SUMMARYSTATS",
            OpType::Shape => "SHAPE",
            OpType::Aggregation => "AGGREGATION",
            OpType::Random => "RANDOM",
            OpType::Custom => "CUSTOM",
            OpType::Graph => "GRAPH",
            OpType::Variable => "VARIABLE",
            OpType::Boolean => "BOOLEAN",
            OpType::Logic => "LOGIC",
        };
        f.write_str(name)
    }
}

/// Which variables a graph announces as its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Only the ids listed in the graph record
    Explicit,
    /// Sink nodes: mapped nodes nobody consumes
    #[default]
    Implicit,
    /// Listed ids followed by the implicit sinks
    ExplicitAndImplicit,
    /// Every external variable and every mapped node
    VariableSpace,
}

impl OutputMode {
    pub fn code(self) -> i8 {
        match self {
            OutputMode::Implicit => 0,
            OutputMode::Explicit => 1,
            OutputMode::ExplicitAndImplicit => 2,
            OutputMode::VariableSpace => 3,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(OutputMode::Implicit),
            1 => Some(OutputMode::Explicit),
            2 => Some(OutputMode::ExplicitAndImplicit),
            3 => Some(OutputMode::VariableSpace),
            _ => None,
        }
    }
}

/// How nodes inside one layer are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One node after another, in stored order
    #[default]
    Sequential,
    /// Layer members may run concurrently
    Auto,
    /// Sequential, and never switched to parallel by heuristics
    Strict,
}

impl ExecutionMode {
    pub fn code(self) -> i8 {
        match self {
            ExecutionMode::Sequential => 0,
            ExecutionMode::Auto => 1,
            ExecutionMode::Strict => 2,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(ExecutionMode::Sequential),
            1 => Some(ExecutionMode::Auto),
            2 => Some(ExecutionMode::Strict),
            _ => None,
        }
    }
}

/// Element type of a serialized array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    #[default]
    Float,
    Double,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
}

impl DataType {
    pub fn code(self) -> i8 {
        match self {
            DataType::Bool => 1,
            DataType::Float => 5,
            DataType::Double => 6,
            DataType::Int8 => 7,
            DataType::Int16 => 8,
            DataType::Int32 => 9,
            DataType::Int64 => 10,
            DataType::Uint8 => 11,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        let dtype = match code {
            1 => DataType::Bool,
            5 => DataType::Float,
            6 => DataType::Double,
            7 => DataType::Int8,
            8 => DataType::Int16,
            9 => DataType::Int32,
            10 => DataType::Int64,
            11 => DataType::Uint8,
            _ => return None,
        };
        Some(dtype)
    }

    /// Size of one element in bytes
    pub fn size_of(self) -> usize {
        match self {
            DataType::Bool | DataType::Int8 | DataType::Uint8 => 1,
            DataType::Int16 => 2,
            DataType::Float | DataType::Int32 => 4,
            DataType::Double | DataType::Int64 => 8,
        }
    }

    pub fn is_floating(self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }
}

/// Byte order of a serialized array payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    Le,
    Be,
}

impl ByteOrder {
    /// Byte order of the running machine
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Be
        } else {
            ByteOrder::Le
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        ByteOrder::native()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_type_codes_are_stable() {
        for op_type in [
            OpType::Transform,
            OpType::Accumulation,
            OpType::Pairwise,
            OpType::Custom,
            OpType::Graph,
            OpType::Boolean,
            OpType::Logic,
        ] {
            assert_eq!(OpType::from_code(op_type.code()), Some(op_type));
        }
        assert_eq!(OpType::Logic.code(), 119);
        assert_eq!(OpType::from_code(13), None);
    }

    #[test]
    fn test_legacy_families() {
        assert!(OpType::Transform.is_legacy());
        assert!(OpType::Accumulation3.is_legacy());
        assert!(!OpType::Custom.is_legacy());
        assert!(!OpType::Logic.is_legacy());
        assert!(!OpType::Graph.is_legacy());
    }

    #[test]
    fn test_output_mode_default_is_implicit() {
        assert_eq!(OutputMode::default(), OutputMode::Implicit);
        assert_eq!(OutputMode::from_code(3), Some(OutputMode::VariableSpace));
        assert_eq!(OutputMode::from_code(9), None);
    }

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(DataType::Float.size_of(), 4);
        assert_eq!(DataType::Double.size_of(), 8);
        assert_eq!(DataType::Bool.size_of(), 1);
        assert_eq!(DataType::Int64.size_of(), 8);
        assert!(DataType::Double.is_floating());
        assert!(!DataType::Int32.is_floating());
    }

    #[test]
    fn test_native_byte_order_matches_target() {
        let expected = if cfg!(target_endian = "big") { ByteOrder::Be } else { ByteOrder::Le };
        assert_eq!(ByteOrder::native(), expected);
        assert_eq!(ByteOrder::default(), expected);
    }
}
