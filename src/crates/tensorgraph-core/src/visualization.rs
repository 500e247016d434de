//! Graph rendering for debugging.
//!
//! Two formats are supported:
//! - **DOT/Graphviz**, one rank per onion layer, scopes as clusters
//! - **ASCII**, a layer-by-layer listing for the console
//!
//! ```text
//! Graph 1
//! =======
//! layer 0: #1 [identity] <- (-1:0)
//! layer 1: #2 [identity] <- (1:0)
//! ```
//!
//! [`Graph::print_out`] emits the same listing through `tracing` at debug
//! level.
//!
//! Rendering builds the graph first; a graph that cannot be built is
//! rendered with its unmapped nodes listed separately.

use crate::graph::Graph;
use crate::node::{Node, NodeKind};
use std::fmt::Write;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizationFormat {
    /// DOT format for Graphviz
    Dot,
    /// Plain text
    Ascii,
}

/// Visualization options
#[derive(Debug, Clone)]
pub struct VisualizationOptions {
    pub format: VisualizationFormat,
    /// Include op type, op number and output ids
    pub include_details: bool,
    pub title: Option<String>,
    /// Render scope members
    pub show_scopes: bool,
}

impl Default for VisualizationOptions {
    fn default() -> Self {
        Self {
            format: VisualizationFormat::Dot,
            include_details: false,
            title: None,
            show_scopes: true,
        }
    }
}

impl VisualizationOptions {
    pub fn dot() -> Self {
        Self {
            format: VisualizationFormat::Dot,
            ..Default::default()
        }
    }

    pub fn ascii() -> Self {
        Self {
            format: VisualizationFormat::Ascii,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_details(mut self) -> Self {
        self.include_details = true;
        self
    }

    pub fn without_scopes(mut self) -> Self {
        self.show_scopes = false;
        self
    }
}

/// Render `graph` as a string.
pub fn visualize(graph: &Graph, options: &VisualizationOptions) -> String {
    if let Err(e) = graph.build_graph() {
        tracing::debug!(graph_id = graph.id(), error = %e, "Rendering unbuilt graph");
    }
    match options.format {
        VisualizationFormat::Dot => visualize_dot(graph, options),
        VisualizationFormat::Ascii => visualize_ascii(graph, options),
    }
}

impl Graph {
    /// Log the onion and the scopes at debug level.
    pub fn print_out(&self) {
        let listing = visualize(self, &VisualizationOptions::ascii().with_details());
        for line in listing.lines().filter(|line| !line.is_empty()) {
            tracing::debug!(graph_id = self.id(), "{}", line);
        }
    }
}

fn label(node: &Node, details: bool) -> String {
    let kind = match node.kind() {
        NodeKind::Operation(op) => op.descriptor().name.clone(),
        NodeKind::Logic(op) => format!("{:?}", op),
        NodeKind::Embedded(child) => format!("graph {}", child.id()),
        NodeKind::Noop => "variable".to_string(),
    };
    let mut label = format!("{} [{}]", node.display_name(), kind);
    if details {
        let _ = write!(label, " {}:{}", node.op_type(), node.op_num());
        if node.is_divergent() {
            label.push_str(" divergent");
        }
    }
    label
}

fn visualize_dot(graph: &Graph, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    output.push_str("digraph G {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n");

    if let Some(title) = &options.title {
        output.push_str("    labelloc=\"t\";\n");
        let _ = writeln!(output, "    label=\"{}\";", escape_dot(title));
    }

    for (layer, ids) in graph.onion() {
        let _ = writeln!(output, "    subgraph layer_{} {{", layer);
        output.push_str("        rank=same;\n");
        for node in ids.iter().filter_map(|id| graph.node(*id)) {
            write_dot_node(&mut output, node, options, "        ");
        }
        output.push_str("    }\n");
    }

    let unmapped = graph.unmapped();
    for node in unmapped.iter().filter_map(|id| graph.node(*id)) {
        let _ = writeln!(
            output,
            "    \"n{}\" [label=\"{}\", color=red];",
            node.id(),
            escape_dot(&label(node, options.include_details))
        );
    }

    if options.show_scopes {
        for scope in graph.scopes() {
            let _ = writeln!(output, "    subgraph cluster_{} {{", scope.id());
            let _ = writeln!(output, "        label=\"{}\";", escape_dot(scope.name()));
            for node in scope.nodes().iter().filter_map(|id| graph.node(*id)) {
                write_dot_node(&mut output, node, options, "        ");
            }
            output.push_str("    }\n");
        }
    }

    for node in graph.nodes() {
        if node.is_scoped() && !options.show_scopes {
            continue;
        }
        for input in node.inputs() {
            if input.is_external() {
                let _ = writeln!(
                    output,
                    "    \"v{}_{}\" [shape=ellipse, label=\"{}\"];",
                    -input.node, input.slot, input
                );
                let _ = writeln!(output, "    \"v{}_{}\" -> \"n{}\";", -input.node, input.slot, node.id());
                continue;
            }
            let producer_divergent = graph.node(input.node).is_some_and(Node::is_divergent);
            if producer_divergent {
                let _ = writeln!(
                    output,
                    "    \"n{}\" -> \"n{}\" [label=\"{}\", style=dashed];",
                    input.node,
                    node.id(),
                    input.slot
                );
            } else {
                let _ = writeln!(output, "    \"n{}\" -> \"n{}\";", input.node, node.id());
            }
        }
    }

    output.push_str("}\n");
    output
}

fn write_dot_node(output: &mut String, node: &Node, options: &VisualizationOptions, indent: &str) {
    let style = match node.kind() {
        NodeKind::Logic(_) => ", shape=diamond",
        NodeKind::Embedded(_) => ", fillcolor=lightblue, style=\"rounded,filled\"",
        _ if node.is_divergent() => ", fillcolor=lightyellow, style=\"rounded,filled\"",
        _ => "",
    };
    let _ = writeln!(
        output,
        "{}\"n{}\" [label=\"{}\"{}];",
        indent,
        node.id(),
        escape_dot(&label(node, options.include_details)),
        style
    );
}

fn visualize_ascii(graph: &Graph, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    let title = options
        .title
        .clone()
        .unwrap_or_else(|| format!("Graph {}", graph.id()));
    let _ = writeln!(output, "{}", title);
    let _ = writeln!(output, "{}", "=".repeat(title.chars().count()));

    for (layer, ids) in graph.onion() {
        for node in ids.iter().filter_map(|id| graph.node(*id)) {
            let _ = writeln!(output, "layer {}: {}", layer, ascii_line(node, options));
        }
    }

    let unmapped = graph.unmapped();
    if !unmapped.is_empty() {
        let _ = writeln!(output, "\nunmapped:");
        for node in unmapped.iter().filter_map(|id| graph.node(*id)) {
            let _ = writeln!(output, "  {}", ascii_line(node, options));
        }
    }

    if options.show_scopes {
        for scope in graph.scopes() {
            let _ = writeln!(output, "\nscope {} '{}':", scope.id(), scope.name());
            for node in scope.nodes().iter().filter_map(|id| graph.node(*id)) {
                let _ = writeln!(output, "  {}", ascii_line(node, options));
            }
        }
    }

    let outputs = graph.outputs();
    if !outputs.is_empty() {
        let ids: Vec<String> = outputs.iter().map(ToString::to_string).collect();
        let _ = writeln!(output, "\noutputs: {}", ids.join(", "));
    }
    output
}

fn ascii_line(node: &Node, options: &VisualizationOptions) -> String {
    let mut line = label(node, options.include_details);
    if !node.inputs().is_empty() {
        let inputs: Vec<String> = node.inputs().iter().map(ToString::to_string).collect();
        let _ = write!(line, " <- {}", inputs.join(", "));
    }
    if options.include_details && !node.outputs().is_empty() {
        let outputs: Vec<String> = node.outputs().iter().map(ToString::to_string).collect();
        let _ = write!(line, " -> {}", outputs.join(", "));
    }
    line
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
