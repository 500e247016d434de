//! Graph construction and scheduling.
//!
//! A [`Graph`] owns its nodes and its [`VariableSpace`] and arranges the
//! nodes into the **onion**: an ordered set of layers where every node sits
//! strictly above each node that produces one of its inputs. Executing the
//! layers in index order therefore respects every data dependency.
//!
//! # Placement
//!
//! Placement happens in two stages:
//!
//! 1. [`Graph::add_node`] places a node immediately when that is trivially
//!    possible: a node whose inputs are all external goes to layer 0, a node
//!    with a single input whose producer is already placed goes right above
//!    it. Everything else waits in the unmapped pool.
//! 2. [`Graph::build_graph`] resolves the pool with a fixed-point loop in
//!    ascending id order. A node resolves once every internal producer is
//!    placed; its layer is one above the highest of them. The loop is
//!    bounded by `build_budget_factor x initial pool size` passes and fails
//!    with [`GraphError::BadGraph`] on a cycle or an undefined producer.
//!
//! Nodes carrying a scope id never enter the onion; they are attached to
//! their [`Scope`] and executed by the logic node that owns it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tensorgraph_core::ops::builtin::Identity;
//! use tensorgraph_core::{Graph, Node, VarId};
//!
//! let mut graph = Graph::new(1);
//! let identity = Arc::new(Identity::new());
//! graph.add_node(Node::operation(1, identity.clone()).with_inputs(vec![VarId::of(-1)])).unwrap();
//! graph.add_node(Node::operation(2, identity.clone()).with_inputs(vec![VarId::of(1)])).unwrap();
//! graph.add_node(Node::operation(3, identity).with_inputs(vec![VarId::of(1), VarId::of(2)])).unwrap();
//!
//! graph.build_graph().unwrap();
//! assert_eq!(graph.layers(), vec![vec![1], vec![2], vec![3]]);
//! assert_eq!(graph.outputs(), vec![VarId::of(3)]);
//! ```

mod import;
mod memory;

use crate::config::ExecutorConfiguration;
use crate::error::{GraphError, Result};
use crate::node::{LogicOp, Node, NodeKind};
use crate::scope::Scope;
use crate::variable::{VarId, Variable};
use crate::variable_space::VariableSpace;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tensorgraph_wire::OutputMode;

/// Scheduling state, rebuilt incrementally as nodes are added.
#[derive(Debug, Clone, Default)]
struct Plan {
    onion: BTreeMap<usize, Vec<i32>>,
    mapped: BTreeSet<i32>,
    unmapped: BTreeSet<i32>,
    outputs: Vec<VarId>,
    passes: usize,
}

impl Plan {
    fn place(&mut self, node: &Node, layer: usize) {
        node.set_layer(layer);
        self.onion.entry(layer).or_default().push(node.id());
        self.mapped.insert(node.id());
        self.unmapped.remove(&node.id());
        tracing::trace!(node_id = node.id(), layer, "Node placed");
    }

    fn onion_order(&self) -> impl Iterator<Item = i32> + '_ {
        self.onion.values().flatten().copied()
    }
}

/// A dataflow graph: nodes, scopes, variables and the execution plan.
pub struct Graph {
    id: i64,
    configuration: ExecutorConfiguration,
    nodes: HashMap<i32, Node>,
    order: Vec<i32>,
    scopes: BTreeMap<i32, Scope>,
    explicit_outputs: Vec<VarId>,
    plan: RwLock<Plan>,
    built: AtomicBool,
    build_lock: Mutex<()>,
    variable_space: RwLock<VariableSpace>,
}

impl Graph {
    /// Empty graph with the default configuration
    pub fn new(id: i64) -> Self {
        Self {
            id,
            configuration: ExecutorConfiguration::default(),
            nodes: HashMap::new(),
            order: Vec::new(),
            scopes: BTreeMap::new(),
            explicit_outputs: Vec::new(),
            plan: RwLock::new(Plan::default()),
            built: AtomicBool::new(false),
            build_lock: Mutex::new(()),
            variable_space: RwLock::new(VariableSpace::new()),
        }
    }

    pub fn with_configuration(mut self, configuration: ExecutorConfiguration) -> Self {
        self.configuration = configuration;
        self.built.store(false, Ordering::Release);
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn configuration(&self) -> &ExecutorConfiguration {
        &self.configuration
    }

    /// Register an externally supplied variable or placeholder.
    pub fn add_variable(&mut self, variable: Variable) {
        self.variable_space.get_mut().put_variable(variable);
        self.built.store(false, Ordering::Release);
    }

    /// Ids reported as outputs in [`OutputMode::Explicit`] and
    /// [`OutputMode::ExplicitAndImplicit`].
    pub fn set_explicit_outputs(&mut self, outputs: Vec<VarId>) {
        self.explicit_outputs = outputs;
        self.built.store(false, Ordering::Release);
    }

    /// Add a node and place it in the onion when its layer is already known.
    ///
    /// # Panics
    ///
    /// If a node with the same id was added before.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        let id = node.id();
        if id <= 0 {
            return Err(GraphError::bad_input(format!(
                "node ids must be positive, got {}",
                id
            )));
        }
        assert!(!self.nodes.contains_key(&id), "node {} added twice", id);

        let space = self.variable_space.get_mut();
        space.ensure(VarId::of(id), node.name());
        match node.kind() {
            NodeKind::Logic(LogicOp::While) => {
                for slot in 1..node.inputs().len().saturating_sub(2) {
                    space.ensure(VarId::new(id, slot as i32), None);
                }
            }
            NodeKind::Operation(op) => {
                for slot in 1..op.descriptor().num_outputs {
                    space.ensure(VarId::new(id, slot as i32), None);
                }
            }
            _ => {}
        }

        if node.logic_op() == Some(LogicOp::Scope) {
            let name = node
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("scope_{}", id));
            self.scopes.insert(id, Scope::new(id, name));
        }

        self.built.store(false, Ordering::Release);

        if node.is_scoped() {
            let scope = self
                .scopes
                .get_mut(&node.scope_id())
                .ok_or(GraphError::UnknownScope(node.scope_id()))?;
            scope.push(id);
            tracing::trace!(node_id = id, scope_id = node.scope_id(), "Node attached to scope");
            self.insert(node);
            return Ok(());
        }

        let plan = self.plan.get_mut();
        let space = self.variable_space.get_mut();
        let inputs = node.inputs();

        if inputs.iter().all(|input| space.is_external(*input)) {
            plan.place(&node, 0);
        } else if inputs.len() == 1 && plan.mapped.contains(&inputs[0].node) {
            match self.nodes.get(&inputs[0].node).and_then(Node::layer) {
                Some(parent) => plan.place(&node, parent + 1),
                None => {
                    plan.unmapped.insert(id);
                }
            }
        } else {
            plan.unmapped.insert(id);
        }

        self.insert(node);
        Ok(())
    }

    fn insert(&mut self, node: Node) {
        self.order.push(node.id());
        self.nodes.insert(node.id(), node);
    }

    /// Resolve every unmapped node and select the outputs.
    ///
    /// Idempotent: a built graph returns immediately. Concurrent callers
    /// block on the build gate and the layering pass runs once.
    #[tracing::instrument(skip(self), fields(graph_id = self.id))]
    pub fn build_graph(&self) -> Result<()> {
        if self.built.load(Ordering::Acquire) {
            return Ok(());
        }
        let _gate = self.build_lock.lock();
        if self.built.load(Ordering::Acquire) {
            return Ok(());
        }

        let space = self.variable_space.read();
        let mut plan = self.plan.write();

        let initial = plan.unmapped.len();
        let budget = initial.saturating_mul(self.configuration.build_budget_factor as usize);
        let mut passes = 0usize;

        while !plan.unmapped.is_empty() {
            if passes >= budget {
                let unresolved: Vec<i32> = plan.unmapped.iter().copied().collect();
                tracing::error!(?unresolved, budget, "Build budget exhausted");
                return Err(GraphError::bad_graph(format!(
                    "build did not converge within {} passes; unresolved nodes {:?}",
                    budget, unresolved
                )));
            }
            passes += 1;

            let mut progressed = false;
            let pending: Vec<i32> = plan.unmapped.iter().copied().collect();
            for id in pending {
                let Some(node) = self.nodes.get(&id) else {
                    continue;
                };
                if let Some(layer) = self.resolve_layer(&plan, &space, node) {
                    plan.place(node, layer);
                    progressed = true;
                }
            }

            if !progressed {
                return Err(self.unresolved_error(&plan));
            }
        }

        plan.outputs = self.select_outputs(&plan, &space);
        plan.passes = passes;
        self.built.store(true, Ordering::Release);

        tracing::debug!(
            layers = plan.onion.len(),
            mapped = plan.mapped.len(),
            outputs = plan.outputs.len(),
            passes,
            "Graph built"
        );
        Ok(())
    }

    fn resolve_layer(&self, plan: &Plan, space: &VariableSpace, node: &Node) -> Option<usize> {
        let mut highest: Option<usize> = None;
        for input in node.inputs() {
            if space.is_external(*input) {
                continue;
            }
            if !plan.mapped.contains(&input.node) {
                return None;
            }
            let layer = self.nodes.get(&input.node).and_then(Node::layer)?;
            highest = Some(highest.map_or(layer, |h| h.max(layer)));
        }
        Some(highest.map_or(0, |h| h + 1))
    }

    fn unresolved_error(&self, plan: &Plan) -> GraphError {
        let unresolved: Vec<i32> = plan.unmapped.iter().copied().collect();
        let mut undefined: Vec<VarId> = plan
            .unmapped
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .flat_map(|node| node.inputs().iter().copied())
            .filter(|input| !input.is_external() && !self.nodes.contains_key(&input.node))
            .collect();
        undefined.sort();
        undefined.dedup();

        tracing::error!(?unresolved, ?undefined, "Unable to schedule nodes");
        if undefined.is_empty() {
            GraphError::bad_graph(format!(
                "unable to schedule nodes {:?}: dependency cycle",
                unresolved
            ))
        } else {
            GraphError::bad_graph(format!(
                "unable to schedule nodes {:?}: undefined producers {}",
                unresolved,
                undefined
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        }
    }

    fn select_outputs(&self, plan: &Plan, space: &VariableSpace) -> Vec<VarId> {
        match self.configuration.output_mode {
            OutputMode::VariableSpace => space
                .externals()
                .iter()
                .copied()
                .chain(plan.onion_order().map(VarId::of))
                .collect(),
            OutputMode::Implicit => self.sinks(plan),
            OutputMode::Explicit => self.explicit_outputs.clone(),
            OutputMode::ExplicitAndImplicit => {
                let mut outputs = self.explicit_outputs.clone();
                for sink in self.sinks(plan) {
                    if !outputs.contains(&sink) {
                        outputs.push(sink);
                    }
                }
                outputs
            }
        }
    }

    /// Mapped non-logic nodes that no mapped node consumes.
    fn sinks(&self, plan: &Plan) -> Vec<VarId> {
        let consumed: HashSet<i32> = plan
            .mapped
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .flat_map(|node| node.inputs().iter().map(|input| input.node))
            .collect();

        plan.onion_order()
            .filter(|id| !consumed.contains(id))
            .filter(|id| self.nodes.get(id).is_some_and(|node| !node.is_logic()))
            .map(VarId::of)
            .collect()
    }

    pub fn is_built(&self) -> bool {
        self.built.load(Ordering::Acquire)
    }

    /// Fixed-point passes the most recent layering run took. Zero when every
    /// node was placed on insertion.
    pub fn build_passes(&self) -> usize {
        self.plan.read().passes
    }

    pub fn node(&self, id: i32) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Snapshot of the onion, layer index to node ids.
    pub fn onion(&self) -> BTreeMap<usize, Vec<i32>> {
        self.plan.read().onion.clone()
    }

    /// Snapshot of the onion as a list of layers.
    pub fn layers(&self) -> Vec<Vec<i32>> {
        self.plan.read().onion.values().cloned().collect()
    }

    pub fn mapped(&self) -> Vec<i32> {
        self.plan.read().mapped.iter().copied().collect()
    }

    pub fn unmapped(&self) -> Vec<i32> {
        self.plan.read().unmapped.iter().copied().collect()
    }

    /// Number of scheduled nodes. Builds the graph first.
    pub fn total_nodes(&self) -> Result<usize> {
        self.build_graph()?;
        Ok(self.plan.read().mapped.len())
    }

    /// Size of layer 0
    pub fn root_nodes(&self) -> usize {
        self.plan.read().onion.get(&0).map_or(0, Vec::len)
    }

    /// Designated outputs, as selected by the last build.
    pub fn outputs(&self) -> Vec<VarId> {
        self.plan.read().outputs.clone()
    }

    /// Copies of the output variables that exist, in output order.
    pub fn fetch_outputs(&self) -> Result<Vec<Variable>> {
        self.build_graph()?;
        let outputs = self.outputs();
        let space = self.variable_space.read();
        Ok(outputs
            .iter()
            .filter_map(|id| space.get(*id))
            .cloned()
            .collect())
    }

    pub fn scope_by_id(&self, id: i32) -> Option<&Scope> {
        self.scopes.get(&id)
    }

    pub fn scope_by_name(&self, name: &str) -> Option<&Scope> {
        self.scopes.values().find(|scope| scope.name() == name)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.values()
    }

    pub fn placeholders(&self) -> Vec<VarId> {
        self.variable_space.read().placeholders().to_vec()
    }

    pub fn number_of_placeholders(&self) -> usize {
        self.variable_space.read().placeholders().len()
    }

    /// Build the graph and check that every node was scheduled.
    pub fn validate(&self) -> Result<()> {
        self.build_graph()?;
        let plan = self.plan.read();
        if !plan.unmapped.is_empty() {
            return Err(GraphError::bad_graph(format!(
                "nodes {:?} are not scheduled",
                plan.unmapped
            )));
        }
        Ok(())
    }

    pub fn variable_space(&self) -> RwLockReadGuard<'_, VariableSpace> {
        self.variable_space.read()
    }

    pub fn variable_space_mut(&self) -> RwLockWriteGuard<'_, VariableSpace> {
        self.variable_space.write()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("scopes", &self.scopes.len())
            .field("built", &self.is_built())
            .finish()
    }
}
