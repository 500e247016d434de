//! Building graphs from flat records and text descriptors.

use super::Graph;
use crate::config::ExecutorConfiguration;
use crate::error::{GraphError, Result};
use crate::node::{LogicOp, Node, NodeKind};
use crate::ops::OpRegistry;
use crate::variable::{VarId, Variable};
use std::collections::HashSet;
use std::path::Path;
use tensorgraph_wire::{FlatGraph, FlatNode, JsonSerializer, OpType, SerializerProtocol};

impl Graph {
    /// Construct a graph from a decoded record, resolving every node's
    /// operation through `registry`.
    ///
    /// Embedded graphs are constructed recursively. Explicit outputs must
    /// name an existing variable or node, otherwise construction fails with
    /// [`GraphError::BadInput`].
    #[tracing::instrument(skip(flat, registry), fields(graph_id = flat.id, nodes = flat.nodes.len()))]
    pub fn from_flat(flat: &FlatGraph, registry: &OpRegistry) -> Result<Graph> {
        let configuration = flat
            .configuration
            .map(ExecutorConfiguration::from)
            .unwrap_or_default();
        let mut graph = Graph::new(flat.id).with_configuration(configuration);

        for variable in &flat.variables {
            graph.add_variable(Variable::from_flat(variable)?);
        }

        let mut seen = HashSet::new();
        for flat_node in &flat.nodes {
            if !seen.insert(flat_node.id) {
                return Err(GraphError::bad_graph(format!(
                    "node id {} appears more than once",
                    flat_node.id
                )));
            }
            graph.add_node(node_from_flat(flat_node, registry)?)?;
        }

        let mut outputs = Vec::with_capacity(flat.outputs.len());
        for pair in &flat.outputs {
            let id = VarId::from(*pair);
            let exists = if id.is_external() {
                graph.variable_space().has_variable(id)
            } else {
                graph.node(id.node).is_some()
            };
            if !exists {
                return Err(GraphError::bad_input(format!(
                    "explicit output {} does not exist",
                    id
                )));
            }
            outputs.push(id);
        }
        graph.set_explicit_outputs(outputs);

        tracing::debug!(
            variables = flat.variables.len(),
            scopes = graph.scopes().count(),
            "Graph imported"
        );
        Ok(graph)
    }

    /// Parse a YAML descriptor of a [`FlatGraph`] and construct it.
    pub fn from_yaml_str(yaml: &str, registry: &OpRegistry) -> Result<Graph> {
        let flat: FlatGraph = serde_yaml::from_str(yaml)?;
        flat.validate()?;
        Graph::from_flat(&flat, registry)
    }

    /// Load a YAML descriptor from a file.
    pub fn from_yaml_file(path: impl AsRef<Path>, registry: &OpRegistry) -> Result<Graph> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| GraphError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Graph::from_yaml_str(&content, registry)
    }

    /// Parse a JSON descriptor of a [`FlatGraph`] and construct it.
    pub fn from_json_str(json: &str, registry: &OpRegistry) -> Result<Graph> {
        let flat: FlatGraph = JsonSerializer::new().loads(json.as_bytes())?;
        flat.validate()?;
        Graph::from_flat(&flat, registry)
    }
}

fn node_kind(flat: &FlatNode, registry: &OpRegistry) -> Result<NodeKind> {
    match flat.op_type {
        OpType::Logic => LogicOp::from_code(flat.op_num)
            .map(NodeKind::Logic)
            .ok_or_else(|| {
                GraphError::bad_params(format!(
                    "node {} uses unknown logic op {}",
                    flat.id, flat.op_num
                ))
            }),
        OpType::Graph => {
            let embedded = flat.embedded.as_deref().ok_or_else(|| {
                GraphError::bad_input(format!("graph node {} carries no embedded graph", flat.id))
            })?;
            Ok(NodeKind::Embedded(Box::new(Graph::from_flat(embedded, registry)?)))
        }
        OpType::Variable => Ok(NodeKind::Noop),
        op_type => Ok(NodeKind::Operation(registry.resolve(op_type, flat.op_num)?)),
    }
}

fn node_from_flat(flat: &FlatNode, registry: &OpRegistry) -> Result<Node> {
    let kind = node_kind(flat, registry)?;
    let mut node = Node::new(flat.id, kind)
        .with_op(flat.op_type, flat.op_num)
        .with_inputs(flat.input_pairs().into_iter().map(VarId::from).collect())
        .with_outputs(flat.output_pairs().into_iter().map(VarId::from).collect())
        .with_int_args(flat.extra_integer.clone())
        .with_float_args(flat.extra_params.clone())
        .with_dimensions(flat.dimensions.clone())
        .with_scalar(flat.scalar)
        .with_data_type(flat.data_type);
    if let Some(name) = &flat.name {
        node = node.with_name(name.clone());
    }
    if flat.scope_id != 0 {
        node = node.with_scope(flat.scope_id, flat.scope_name.clone());
    }
    Ok(node)
}
