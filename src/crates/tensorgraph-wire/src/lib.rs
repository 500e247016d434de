//! # tensorgraph-wire - Serialized graph and result records
//!
//! Plain data records exchanged with the tensorgraph engine:
//!
//! - [`FlatGraph`], [`FlatNode`], [`FlatVariable`], [`FlatArray`]: the graph
//!   description handed to the executioner.
//! - [`FlatResult`], [`FlatTiming`]: what a buffer execution hands back.
//! - [`codec`]: the framed binary format (`TGRF` / `TGRS` magic, version,
//!   bincode payload).
//! - [`SerializerProtocol`]: bincode for frame payloads, JSON for
//!   hand-written descriptors of the same records.
//!
//! ## Example
//!
//! ```rust
//! use tensorgraph_wire::{codec, FlatGraph, FlatNode, OpType};
//!
//! let graph = FlatGraph::new(1)
//!     .with_node(FlatNode::new(1, OpType::Custom, 0).with_inputs(vec![-1]));
//!
//! let bytes = codec::encode_graph(&graph).unwrap();
//! assert_eq!(codec::decode_graph(&bytes).unwrap(), graph);
//! ```

pub mod codec;
pub mod error;
pub mod graph;
pub mod result;
pub mod serializer;
pub mod types;

pub use error::{Result, WireError};
pub use graph::{FlatArray, FlatConfiguration, FlatGraph, FlatNode, FlatVariable, IntPair, LongPair};
pub use result::{FlatResult, FlatTiming};
pub use serializer::{BincodeSerializer, JsonSerializer, SerializerProtocol};
pub use types::{ByteOrder, DataType, ExecutionMode, OpType, OutputMode};
