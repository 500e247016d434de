//! Serialized entry points: execute an encoded graph, import from a file.

use super::GraphExecutioner;
use crate::error::{GraphError, Result};
use crate::flow_path::FlowPath;
use crate::graph::Graph;
use crate::ops::OpRegistry;
use std::path::Path;
use tensorgraph_wire::{codec, ByteOrder, FlatResult, FlatTiming, FlatVariable};

impl GraphExecutioner {
    /// Decode a graph, execute it, and return the encoded result.
    ///
    /// The result lists every output holding a tensor, encoded in native
    /// byte order, and one timing entry per scheduled non-logic node in
    /// insertion order.
    #[tracing::instrument(skip(self, buffer, registry), fields(bytes = buffer.len()))]
    pub fn execute_from_buffer(&self, buffer: &[u8], registry: &OpRegistry) -> Result<Vec<u8>> {
        let flat = codec::decode_graph(buffer)?;
        let graph = Graph::from_flat(&flat, registry)?;

        let mut flow = FlowPath::new();
        self.execute_with_flow_path(&graph, &mut flow)?;

        let result = self.collect_result(&graph, &flow)?;
        tracing::debug!(
            variables = result.variables.len(),
            timings = result.timing.len(),
            "Execution result collected"
        );
        Ok(codec::encode_result(&result)?)
    }

    /// Assemble the result record of an executed graph.
    pub fn collect_result(&self, graph: &Graph, flow: &FlowPath) -> Result<FlatResult> {
        let mut result = FlatResult::new(graph.id());

        for variable in graph.fetch_outputs()? {
            let Some(tensor) = variable.tensor() else {
                tracing::trace!(variable = %variable.id(), "Output holds no tensor, omitted");
                continue;
            };
            let mut flat = FlatVariable::new(variable.id().into())
                .with_array(tensor.to_flat(ByteOrder::native()));
            if let Some(name) = variable.name() {
                flat = flat.with_name(name);
            }
            result.variables.push(flat);
        }

        result.timing = graph
            .nodes()
            .filter(|node| !node.is_logic() && node.layer().is_some())
            .map(|node| {
                FlatTiming::new(
                    node.id(),
                    node.name().map(str::to_string),
                    flow.outer_time(node.id()),
                    flow.inner_time(node.id()),
                )
            })
            .collect();

        Ok(result)
    }
}

/// Execute an encoded graph with the default executioner.
pub fn execute_from_buffer(buffer: &[u8], registry: &OpRegistry) -> Result<Vec<u8>> {
    GraphExecutioner::new().execute_from_buffer(buffer, registry)
}

/// Read an encoded graph from `path` and construct it.
pub fn import_from_file(path: impl AsRef<Path>, registry: &OpRegistry) -> Result<Graph> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| GraphError::File {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Importing graph");

    let flat = codec::decode_graph(&bytes)?;
    Graph::from_flat(&flat, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use crate::ops::op_hash;
    use crate::tensor::Tensor;
    use tensorgraph_wire::{FlatGraph, FlatNode, IntPair, OpType};

    fn encoded() -> Vec<u8> {
        let input = Tensor::vector(vec![1.0, 2.0, 3.0]).to_flat(ByteOrder::Le);
        let graph = FlatGraph::new(11)
            .with_variable(FlatVariable::new(IntPair::new(-1, 0)).with_name("x").with_array(input))
            .with_node(
                FlatNode::new(1, OpType::Custom, op_hash("identity"))
                    .with_name("copy")
                    .with_inputs(vec![-1]),
            );
        codec::encode_graph(&graph).unwrap()
    }

    #[test]
    fn test_buffer_round_trip() {
        let bytes = execute_from_buffer(&encoded(), &OpRegistry::with_builtins()).unwrap();
        let result = codec::decode_result(&bytes).unwrap();

        assert_eq!(result.id, 11);
        assert_eq!(result.variables.len(), 1);
        let out = result.variable(IntPair::new(1, 0)).unwrap();
        assert_eq!(out.name.as_deref(), Some("copy"));
        let tensor = Tensor::from_flat(out.array.as_ref().unwrap()).unwrap();
        assert_eq!(tensor.data(), &[1.0, 2.0, 3.0]);

        assert_eq!(result.timing.len(), 1);
        assert_eq!(result.timing[0].id, 1);
    }

    #[test]
    fn test_garbage_buffer() {
        let err = execute_from_buffer(b"nope", &OpRegistry::with_builtins()).unwrap_err();
        assert_eq!(err.status(), Status::BadInput);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = import_from_file("/definitely/not/here.tgrf", &OpRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.tgrf"));
        assert_eq!(err.status(), Status::BadInput);
    }
}
