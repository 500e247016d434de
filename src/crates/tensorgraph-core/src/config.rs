//! Per-graph executor configuration

use serde::{Deserialize, Serialize};
use tensorgraph_wire::{ExecutionMode, FlatConfiguration, OutputMode};

/// Settings that shape how a graph is built and executed.
///
/// Decoded from the graph record when present, otherwise the defaults apply:
/// implicit outputs, sequential execution, ten million loop iterations and a
/// build budget of twice the number of initially unresolved nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfiguration {
    /// Which variables become graph outputs after the build
    pub output_mode: OutputMode,
    /// Intra-layer dispatch policy
    pub execution_mode: ExecutionMode,
    /// Upper bound on iterations of a single while loop
    pub max_loop_iterations: u64,
    /// Multiplier applied to the initial unmapped count to bound build passes
    pub build_budget_factor: u32,
}

impl Default for ExecutorConfiguration {
    fn default() -> Self {
        FlatConfiguration::default().into()
    }
}

impl ExecutorConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn with_max_loop_iterations(mut self, iterations: u64) -> Self {
        self.max_loop_iterations = iterations;
        self
    }

    pub fn with_build_budget_factor(mut self, factor: u32) -> Self {
        self.build_budget_factor = factor.max(1);
        self
    }

    /// Whether layer members may be dispatched to worker threads.
    pub fn is_parallel(&self) -> bool {
        self.execution_mode == ExecutionMode::Auto
    }
}

impl From<FlatConfiguration> for ExecutorConfiguration {
    fn from(flat: FlatConfiguration) -> Self {
        Self {
            output_mode: flat.output_mode,
            execution_mode: flat.execution_mode,
            max_loop_iterations: flat.max_loop_iterations,
            build_budget_factor: flat.build_budget_factor.max(1),
        }
    }
}

impl From<ExecutorConfiguration> for FlatConfiguration {
    fn from(config: ExecutorConfiguration) -> Self {
        Self {
            output_mode: config.output_mode,
            execution_mode: config.execution_mode,
            max_loop_iterations: config.max_loop_iterations,
            build_budget_factor: config.build_budget_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfiguration::default();
        assert_eq!(config.output_mode, OutputMode::Implicit);
        assert_eq!(config.execution_mode, ExecutionMode::Sequential);
        assert_eq!(config.max_loop_iterations, 10_000_000);
        assert_eq!(config.build_budget_factor, 2);
        assert!(!config.is_parallel());
    }

    #[test]
    fn test_builder() {
        let config = ExecutorConfiguration::new()
            .with_output_mode(OutputMode::VariableSpace)
            .with_execution_mode(ExecutionMode::Auto)
            .with_max_loop_iterations(5)
            .with_build_budget_factor(0);
        assert!(config.is_parallel());
        assert_eq!(config.max_loop_iterations, 5);
        assert_eq!(config.build_budget_factor, 1);
    }

    #[test]
    fn test_strict_is_sequential() {
        let config = ExecutorConfiguration::new().with_execution_mode(ExecutionMode::Strict);
        assert!(!config.is_parallel());
    }

    #[test]
    fn test_serde_json() {
        let config = ExecutorConfiguration::new().with_output_mode(OutputMode::Explicit);
        let json = serde_json::to_value(config).unwrap();
        assert_eq!(json["output_mode"], "explicit");
        let back: ExecutorConfiguration = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
