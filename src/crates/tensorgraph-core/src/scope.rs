//! Named groups of nodes executed on demand by logic nodes.

/// Nodes attached to a scope are kept out of the onion. Loop and conditional
/// logic runs them explicitly, in attachment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    id: i32,
    name: String,
    nodes: Vec<i32>,
}

impl Scope {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn push(&mut self, node: i32) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[i32] {
        &self.nodes
    }

    /// Node whose result is the scope's result
    pub fn last_node(&self) -> Option<i32> {
        self.nodes.last().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
