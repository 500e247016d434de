//! Error types and status codes for graph construction and execution
//!
//! Every fallible operation in this crate returns [`Result`]. Errors carry
//! enough context (node ids, variable ids, paths) to be logged directly;
//! callers that need the coarse numeric status of the engine use
//! [`GraphError::status`].
//!
//! # Error Hierarchy
//!
//! ```text
//! GraphError
//! ├── BadInput          - Missing or mismatched inputs, unknown variables
//! ├── BadParams         - Malformed node arguments
//! ├── BadGraph          - Unsatisfiable ordering, unbuilt graph
//! ├── BadLength         - Element counts that do not match a shape
//! ├── BadDimensions     - Shapes that do not agree
//! ├── BadOrder          - Memory order not supported by a kernel
//! ├── KernelFailure     - An operation body failed
//! ├── UnknownOperation  - No registered operation for (type, number)
//! ├── UnknownScope      - Node refers to a scope that was never declared
//! ├── Unsupported       - Logic operation this engine does not execute
//! ├── Wire / Yaml       - Descriptor decoding errors
//! └── Io / File         - I/O failures
//! ```
//!
//! # Status codes
//!
//! ```rust
//! use tensorgraph_core::error::{GraphError, Status};
//!
//! let err = GraphError::bad_graph("node 3 depends on itself");
//! assert_eq!(err.status(), Status::BadGraph);
//! assert_eq!(err.status().code(), 30);
//! ```

use crate::variable::VarId;
use std::fmt;
use std::path::PathBuf;
use tensorgraph_wire::{OpType, WireError};
use thiserror::Error;

/// Convenience result type using [`GraphError`]
pub type Result<T> = std::result::Result<T, GraphError>;

/// Numeric status surfaced to callers of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    BadInput,
    BadParams,
    BadGraph,
    BadLength,
    BadDimensions,
    BadOrder,
    KernelFailure,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::BadInput => 1,
            Status::BadParams => 4,
            Status::BadGraph => 30,
            Status::BadLength => 31,
            Status::BadDimensions => 32,
            Status::BadOrder => 33,
            Status::KernelFailure => 50,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ok => "OK",
            Status::BadInput => "BAD_INPUT",
            Status::BadParams => "BAD_PARAMS",
            Status::BadGraph => "BAD_GRAPH",
            Status::BadLength => "BAD_LENGTH",
            Status::BadDimensions => "BAD_DIMENSIONS",
            Status::BadOrder => "BAD_ORDER",
            Status::KernelFailure => "KERNEL_FAILURE",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

impl<T> From<&Result<T>> for Status {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(e) => e.status(),
        }
    }
}

/// Error type for all graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    /// Inputs are missing, of the wrong count, or refer to unknown variables
    #[error("Bad input: {0}")]
    BadInput(String),

    /// Node arguments are malformed
    #[error("Bad params: {0}")]
    BadParams(String),

    /// The graph cannot be scheduled or is not built
    #[error("Bad graph: {0}")]
    BadGraph(String),

    /// Element count does not match the declared shape
    #[error("Bad length: {0}")]
    BadLength(String),

    /// Shapes do not agree
    #[error("Bad dimensions: {0}")]
    BadDimensions(String),

    /// Unsupported memory order
    #[error("Bad order: {0}")]
    BadOrder(String),

    /// An operation body reported a failure
    #[error("Kernel failure in node {node}: {message}")]
    KernelFailure {
        /// Id of the failing node
        node: i32,
        /// Failure description
        message: String,
    },

    /// No operation registered for the given type and number
    #[error("Unknown operation {op_type} #{op_num}")]
    UnknownOperation { op_type: OpType, op_num: i64 },

    /// A node refers to a scope id that was never declared
    #[error("Unknown scope {0}")]
    UnknownScope(i32),

    /// A variable that must exist is absent
    #[error("Unknown variable {0}")]
    UnknownVariable(VarId),

    /// Recognized but not executable by this engine
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Framed buffer or JSON descriptor could not be decoded or encoded
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    /// YAML descriptor error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a specific file
    #[error("Cannot read '{}': {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GraphError {
    pub fn bad_input(msg: impl Into<String>) -> Self {
        Self::BadInput(msg.into())
    }

    pub fn bad_params(msg: impl Into<String>) -> Self {
        Self::BadParams(msg.into())
    }

    pub fn bad_graph(msg: impl Into<String>) -> Self {
        Self::BadGraph(msg.into())
    }

    pub fn bad_dimensions(msg: impl Into<String>) -> Self {
        Self::BadDimensions(msg.into())
    }

    pub fn bad_length(msg: impl Into<String>) -> Self {
        Self::BadLength(msg.into())
    }

    /// Kernel failure attributed to a node
    pub fn kernel_failure(node: i32, message: impl Into<String>) -> Self {
        Self::KernelFailure {
            node,
            message: message.into(),
        }
    }

    /// Numeric status for this error.
    pub fn status(&self) -> Status {
        match self {
            GraphError::BadInput(_)
            | GraphError::UnknownVariable(_)
            | GraphError::Wire(_)
            | GraphError::Yaml(_)
            | GraphError::Io(_)
            | GraphError::File { .. } => Status::BadInput,
            GraphError::BadParams(_) | GraphError::Unsupported(_) => Status::BadParams,
            GraphError::BadGraph(_)
            | GraphError::UnknownOperation { .. }
            | GraphError::UnknownScope(_) => Status::BadGraph,
            GraphError::BadLength(_) => Status::BadLength,
            GraphError::BadDimensions(_) => Status::BadDimensions,
            GraphError::BadOrder(_) => Status::BadOrder,
            GraphError::KernelFailure { .. } => Status::KernelFailure,
        }
    }
}
