//! Error types for the evolution strategy.

use crate::schema::ConfigError;

/// Failure of a single evolution operator (marriage, recombination,
/// mutation, selection).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperatorError {
    #[error("{operator}: empty input")]
    EmptyInput { operator: &'static str },
    #[error("{operator}: parameter vectors have mismatched lengths ({expected} vs {found})")]
    ShapeMismatch {
        operator: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{operator}: need {needed} individuals but only {available} are available")]
    NotEnoughIndividuals {
        operator: &'static str,
        needed: usize,
        available: usize,
    },
}

/// Hard failure of a cost function (not the infeasible sentinel).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cost evaluation failed: {0}")]
pub struct CostError(pub String);

impl From<String> for CostError {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CostError {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Errors surfaced by the evolution engine.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("invalid evolution run: {0}")]
    Config(#[from] ConfigError),
    #[error("initializer produced {created} individuals, expected {expected}")]
    PopulationTooSmall { expected: usize, created: usize },
    #[error("generation aborted: {0}")]
    Operator(#[from] OperatorError),
    #[error("fitness evaluation failed: {0}")]
    Evaluation(#[from] CostError),
    #[error("evolution run has not been started")]
    NotRunning,
}
