//! Per-execution record of which nodes ran, which branch divergence points
//! chose, and how long each node took.

use std::collections::HashMap;

/// State of one node within a single execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeState {
    pub active: bool,
    pub branch: i32,
    /// Whole node step, microseconds
    pub outer_time: i64,
    /// Operation body only, microseconds
    pub inner_time: i64,
    pub executed: bool,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            active: true,
            branch: 0,
            outer_time: 0,
            inner_time: 0,
            executed: false,
        }
    }
}

/// Execution trace keyed by node id.
///
/// Nodes never seen are treated as active on branch 0.
#[derive(Debug, Clone, Default)]
pub struct FlowPath {
    states: HashMap<i32, NodeState>,
}

impl FlowPath {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, node: i32) -> &mut NodeState {
        self.states.entry(node).or_default()
    }

    pub fn is_active(&self, node: i32) -> bool {
        self.states.get(&node).map_or(true, |s| s.active)
    }

    pub fn mark_active(&mut self, node: i32, active: bool) {
        self.ensure(node).active = active;
    }

    pub fn branch(&self, node: i32) -> i32 {
        self.states.get(&node).map_or(0, |s| s.branch)
    }

    pub fn set_branch(&mut self, node: i32, branch: i32) {
        self.ensure(node).branch = branch;
    }

    pub fn outer_time(&self, node: i32) -> i64 {
        self.states.get(&node).map_or(0, |s| s.outer_time)
    }

    pub fn set_outer_time(&mut self, node: i32, micros: i64) {
        self.ensure(node).outer_time = micros;
    }

    pub fn inner_time(&self, node: i32) -> i64 {
        self.states.get(&node).map_or(0, |s| s.inner_time)
    }

    pub fn set_inner_time(&mut self, node: i32, micros: i64) {
        self.ensure(node).inner_time = micros;
    }

    /// Whether the node body ran at least once during this execution.
    pub fn was_executed(&self, node: i32) -> bool {
        self.states.get(&node).is_some_and(|s| s.executed)
    }

    pub(crate) fn mark_executed(&mut self, node: i32) {
        let state = self.ensure(node);
        state.active = true;
        state.executed = true;
    }

    pub fn state(&self, node: i32) -> Option<&NodeState> {
        self.states.get(&node)
    }

    /// Forget everything; every node becomes active on branch 0 again.
    pub fn reset(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_node_defaults() {
        let flow = FlowPath::new();
        assert!(flow.is_active(42));
        assert_eq!(flow.branch(42), 0);
        assert_eq!(flow.outer_time(42), 0);
        assert!(!flow.was_executed(42));
    }

    #[test]
    fn test_record_and_reset() {
        let mut flow = FlowPath::new();
        flow.mark_active(3, false);
        flow.set_branch(2, 1);
        flow.set_outer_time(2, 15);
        flow.set_inner_time(2, 9);
        flow.mark_executed(2);

        assert!(!flow.is_active(3));
        assert_eq!(flow.branch(2), 1);
        assert_eq!(flow.state(2).unwrap().inner_time, 9);
        assert!(flow.was_executed(2));

        flow.reset();
        assert!(flow.is_active(3));
        assert_eq!(flow.branch(2), 0);
    }
}
