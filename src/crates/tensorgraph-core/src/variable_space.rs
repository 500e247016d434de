//! Arena of variables owned by a graph, keyed by [`VarId`].

use crate::error::{GraphError, Result};
use crate::tensor::Tensor;
use crate::variable::{VarId, Variable, VariableValue};
use std::collections::HashMap;

/// Every variable of one graph.
///
/// Besides the id index the space keeps a name index for symbolic lookup,
/// and remembers which variables were supplied from outside the graph
/// (externals) and which of those must be filled by the caller
/// (placeholders), in registration order.
#[derive(Debug, Clone, Default)]
pub struct VariableSpace {
    variables: HashMap<VarId, Variable>,
    names: HashMap<String, VarId>,
    externals: Vec<VarId>,
    placeholders: Vec<VarId>,
}

impl VariableSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable.
    pub fn put_variable(&mut self, variable: Variable) {
        let id = variable.id();
        if let Some(name) = variable.name() {
            self.names.insert(name.to_string(), id);
        }
        if variable.is_external() && !self.externals.contains(&id) {
            self.externals.push(id);
        }
        if variable.is_placeholder() && !self.placeholders.contains(&id) {
            self.placeholders.push(id);
        }
        self.variables.insert(id, variable);
    }

    /// Create an empty variable at `id` unless one exists; name it if a name
    /// is given and the variable has none yet.
    pub fn ensure(&mut self, id: VarId, name: Option<&str>) -> &mut Variable {
        let names = &mut self.names;
        let variable = self.variables.entry(id).or_insert_with(|| Variable::new(id));
        if let Some(name) = name {
            if variable.name().is_none() {
                variable.set_name(name);
                names.entry(name.to_string()).or_insert(id);
            }
        }
        variable
    }

    /// Store `value` at `id`, creating the variable if needed.
    pub fn assign(&mut self, id: VarId, value: VariableValue) -> Result<()> {
        self.ensure(id, None).set_value(value)
    }

    /// Convenience for [`assign`](Self::assign) with a tensor.
    pub fn put_tensor(&mut self, id: VarId, tensor: Tensor) -> Result<()> {
        self.assign(id, VariableValue::Tensor(tensor))
    }

    /// Store `tensor` in the variable called `name`.
    pub fn put_tensor_by_name(&mut self, name: &str, tensor: Tensor) -> Result<()> {
        let id = self
            .names
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::bad_input(format!("no variable named '{}'", name)))?;
        self.put_tensor(id, tensor)
    }

    pub fn has_variable(&self, id: VarId) -> bool {
        self.variables.contains_key(&id)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn get(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(&id)
    }

    pub fn get_mut(&mut self, id: VarId) -> Option<&mut Variable> {
        self.variables.get_mut(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Variable> {
        self.names.get(name).and_then(|id| self.variables.get(id))
    }

    /// Tensor at `id`, or an error naming the missing piece.
    pub fn tensor(&self, id: VarId) -> Result<&Tensor> {
        let variable = self.get(id).ok_or(GraphError::UnknownVariable(id))?;
        variable
            .tensor()
            .ok_or_else(|| GraphError::bad_input(format!("variable {} holds no tensor", id)))
    }

    /// External inputs are either addressed with a non-positive node id or
    /// registered as external.
    pub fn is_external(&self, id: VarId) -> bool {
        id.is_external() || self.variables.get(&id).is_some_and(|v| v.is_external())
    }

    pub fn externals(&self) -> &[VarId] {
        &self.externals
    }

    pub fn placeholders(&self) -> &[VarId] {
        &self.placeholders
    }

    /// Remove a variable from the space.
    pub fn remove(&mut self, id: VarId) -> Option<Variable> {
        let variable = self.variables.remove(&id)?;
        if let Some(name) = variable.name() {
            if self.names.get(name) == Some(&id) {
                self.names.remove(name);
            }
        }
        self.externals.retain(|e| *e != id);
        self.placeholders.retain(|p| *p != id);
        Some(variable)
    }

    /// Move the value out of `id`, leaving the variable empty.
    pub fn detach(&mut self, id: VarId) -> Option<VariableValue> {
        self.variables.get_mut(&id).map(Variable::take_value)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Bytes currently held by tensor values
    pub fn total_memory(&self) -> usize {
        self.variables
            .values()
            .map(|v| match v.value() {
                VariableValue::Tensor(t) => t.size_in_bytes(),
                VariableValue::List(l) => l.iter().map(Tensor::size_in_bytes).sum(),
                VariableValue::Empty => 0,
            })
            .sum()
    }
}
