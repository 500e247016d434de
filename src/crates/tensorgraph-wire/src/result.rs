//! Result records produced by a buffer execution.

use crate::graph::{FlatVariable, IntPair, LongPair};
use serde::{Deserialize, Serialize};

/// Wall-clock timing of one operation node, in microseconds.
///
/// `timing.first` is the outer time (the whole node step including input
/// binding), `timing.second` the inner time (operation body only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatTiming {
    pub id: i32,
    #[serde(default)]
    pub name: Option<String>,
    pub timing: LongPair,
}

impl FlatTiming {
    pub fn new(id: i32, name: Option<String>, outer: i64, inner: i64) -> Self {
        Self {
            id,
            name,
            timing: LongPair::new(outer, inner),
        }
    }

    pub fn outer(&self) -> i64 {
        self.timing.first
    }

    pub fn inner(&self) -> i64 {
        self.timing.second
    }
}

/// Outputs and timings of one executed graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlatResult {
    pub id: i64,
    #[serde(default)]
    pub variables: Vec<FlatVariable>,
    #[serde(default)]
    pub timing: Vec<FlatTiming>,
}

impl FlatResult {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Output variable by id, if the result carries it.
    pub fn variable(&self, id: IntPair) -> Option<&FlatVariable> {
        self.variables.iter().find(|v| v.id == id)
    }

    /// Output variable by name.
    pub fn variable_by_name(&self, name: &str) -> Option<&FlatVariable> {
        self.variables
            .iter()
            .find(|v| v.name.as_deref() == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id_and_name() {
        let mut result = FlatResult::new(7);
        result
            .variables
            .push(FlatVariable::new(IntPair::new(3, 0)).with_name("logits"));
        result.timing.push(FlatTiming::new(3, Some("logits".into()), 12, 9));

        assert!(result.variable(IntPair::new(3, 0)).is_some());
        assert!(result.variable(IntPair::new(3, 1)).is_none());
        assert!(result.variable_by_name("logits").is_some());
        assert!(result.variable_by_name("loss").is_none());
        assert_eq!(result.timing[0].outer(), 12);
        assert_eq!(result.timing[0].inner(), 9);
    }
}
