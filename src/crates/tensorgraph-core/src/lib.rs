//! # tensorgraph-core - Layered dataflow-graph execution
//!
//! A computation is a directed graph of [`Node`]s exchanging tensors
//! through a [`VariableSpace`]. Before execution the graph arranges its
//! nodes into the **onion**: numbered layers where every node sits above
//! all of its producers, so running the layers in order respects every
//! data dependency.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  FlatGraph (tensorgraph-wire)                              │
//! │  bytes / YAML / JSON                                       │
//! └─────────────┬──────────────────────────────────────────────┘
//!               │ Graph::from_flat(flat, &OpRegistry)
//!               ↓
//! ┌────────────────────────────────────────────────────────────┐
//! │  Graph                                                     │
//! │  • nodes + scopes                                          │
//! │  • VariableSpace (externals, placeholders, node outputs)   │
//! │  • onion: layer -> node ids   (build_graph)                │
//! └─────────────┬──────────────────────────────────────────────┘
//!               │ GraphExecutioner::execute_with_flow_path
//!               ↓
//! ┌────────────────────────────────────────────────────────────┐
//! │  per layer, per node                                       │
//! │  • logic nodes  -> LogicExecutor (while, conditional, ...) │
//! │  • skip test    -> FlowPath (active flags, branches)       │
//! │  • operations   -> Operation::execute(Context)             │
//! │  • embedded     -> child graph, outputs migrated back      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Divergence
//!
//! An operation flagged divergent (e.g. [`ops::builtin::Switch`]) chooses a
//! branch at run time. A consumer reading slot `k` of a divergence point
//! runs only when the chosen branch is `k`; everything downstream of a
//! skipped node is skipped too. The choices of one run are recorded in a
//! [`FlowPath`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tensorgraph_core::ops::builtin::Identity;
//! use tensorgraph_core::{Graph, GraphExecutioner, Node, Tensor, VarId, Variable};
//!
//! let mut graph = Graph::new(1);
//! graph.add_variable(Variable::external(VarId::of(-1), Tensor::vector(vec![1.0, 2.0])));
//! graph
//!     .add_node(Node::operation(1, Arc::new(Identity::new())).with_inputs(vec![VarId::of(-1)]))
//!     .unwrap();
//!
//! GraphExecutioner::new().execute(&graph).unwrap();
//!
//! let outputs = graph.fetch_outputs().unwrap();
//! assert_eq!(outputs[0].tensor().unwrap().data(), &[1.0, 2.0]);
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod flow_path;
pub mod graph;
pub mod logic;
pub mod node;
pub mod ops;
pub mod scope;
pub mod tensor;
pub mod variable;
pub mod variable_space;
pub mod visualization;

// Re-export main types
pub use config::ExecutorConfiguration;
pub use error::{GraphError, Result, Status};
pub use executor::{execute_from_buffer, import_from_file, GraphExecutioner};
pub use flow_path::{FlowPath, NodeState};
pub use graph::Graph;
pub use logic::{DefaultLogicExecutor, LogicExecutor};
pub use node::{LogicOp, Node, NodeKind};
pub use ops::{op_hash, Context, OpDescriptor, OpRegistry, Operation};
pub use scope::Scope;
pub use tensor::{Tensor, TensorList};
pub use variable::{VarId, Variable, VariableValue};
pub use variable_space::VariableSpace;
pub use visualization::{visualize, VisualizationFormat, VisualizationOptions};

pub use tensorgraph_wire::{ByteOrder, DataType, ExecutionMode, OpType, OutputMode};
