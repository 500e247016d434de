//! Variables: named, addressable slots that hold tensor values.

use crate::error::{GraphError, Result};
use crate::tensor::{Tensor, TensorList};
use std::fmt;
use tensorgraph_wire::{FlatVariable, IntPair};

/// Variable address: producing node and output slot.
///
/// Negative node ids denote externally supplied variables and placeholders,
/// positive ids are outputs of graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId {
    pub node: i32,
    pub slot: i32,
}

impl VarId {
    pub fn new(node: i32, slot: i32) -> Self {
        Self { node, slot }
    }

    /// Slot 0 of `node`
    pub fn of(node: i32) -> Self {
        Self { node, slot: 0 }
    }

    /// Not produced by any node of the graph.
    pub fn is_external(&self) -> bool {
        self.node <= 0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.node, self.slot)
    }
}

impl From<IntPair> for VarId {
    fn from(pair: IntPair) -> Self {
        Self::new(pair.first, pair.second)
    }
}

impl From<VarId> for IntPair {
    fn from(id: VarId) -> Self {
        IntPair::new(id.node, id.slot)
    }
}

/// What a variable currently holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum VariableValue {
    #[default]
    Empty,
    Tensor(Tensor),
    List(TensorList),
}

impl VariableValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, VariableValue::Empty)
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            VariableValue::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TensorList> {
        match self {
            VariableValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<Tensor> for VariableValue {
    fn from(tensor: Tensor) -> Self {
        VariableValue::Tensor(tensor)
    }
}

impl From<TensorList> for VariableValue {
    fn from(list: TensorList) -> Self {
        VariableValue::List(list)
    }
}

/// A slot in the variable space.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    id: VarId,
    name: Option<String>,
    value: VariableValue,
    removable: bool,
    placeholder: bool,
    external: bool,
}

impl Variable {
    /// Empty, removable variable
    pub fn new(id: VarId) -> Self {
        Self {
            id,
            name: None,
            value: VariableValue::Empty,
            removable: true,
            placeholder: false,
            external: false,
        }
    }

    /// Externally supplied value. The engine assigns into it but never
    /// replaces or frees it.
    pub fn external(id: VarId, tensor: Tensor) -> Self {
        Self {
            value: VariableValue::Tensor(tensor),
            removable: false,
            external: true,
            ..Self::new(id)
        }
    }

    /// Value the caller must supply before execution.
    pub fn placeholder(id: VarId) -> Self {
        Self {
            removable: false,
            placeholder: true,
            external: true,
            ..Self::new(id)
        }
    }

    /// Decode a variable record. Records without an array are placeholders.
    pub fn from_flat(flat: &FlatVariable) -> Result<Self> {
        let id = VarId::from(flat.id);
        let variable = match &flat.array {
            Some(array) => Self::external(id, Tensor::from_flat(array)?),
            None => Self::placeholder(id),
        };
        Ok(match &flat.name {
            Some(name) => variable.with_name(name.clone()),
            None => variable,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<VariableValue>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_removable(mut self, removable: bool) -> Self {
        self.removable = removable;
        self
    }

    pub fn id(&self) -> VarId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn value(&self) -> &VariableValue {
        &self.value
    }

    pub fn tensor(&self) -> Option<&Tensor> {
        self.value.as_tensor()
    }

    pub fn list(&self) -> Option<&TensorList> {
        self.value.as_list()
    }

    pub fn has_value(&self) -> bool {
        !self.value.is_empty()
    }

    pub fn is_removable(&self) -> bool {
        self.removable
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn is_external(&self) -> bool {
        self.external || self.id.is_external()
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Store a new value.
    ///
    /// A non-removable, non-placeholder variable that already holds a tensor
    /// keeps its allocation: the new tensor is assigned into it element by
    /// element and must have the same length.
    pub fn set_value(&mut self, value: VariableValue) -> Result<()> {
        let id = self.id;
        if !self.removable && !self.placeholder {
            if let (VariableValue::Tensor(existing), VariableValue::Tensor(incoming)) =
                (&mut self.value, &value)
            {
                return existing
                    .assign(incoming)
                    .map_err(|e| GraphError::bad_length(format!("assign into {}: {}", id, e)));
            }
        }
        self.value = value;
        Ok(())
    }

    /// Move the value out, leaving the variable empty.
    pub fn take_value(&mut self) -> VariableValue {
        std::mem::take(&mut self.value)
    }
}
