//! Run state, statistics and progress snapshots.

use serde::{Deserialize, Serialize};

/// Run-level state of an evolution strategy, updated once per generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EsInformation {
    pub current_generation: usize,
    pub mu: usize,
    pub rho: usize,
    pub lambda: usize,
    pub number_of_strategy_parameters: usize,
    pub number_of_object_parameters: usize,
    /// Offspring of the last generation that beat their best parent.
    pub number_of_last_successful_individuals: usize,
    pub best_fitness: f64,
    pub worst_fitness: f64,
    pub mean_fitness: f64,
    pub fitness_std: f64,
}

/// Descriptive statistics of a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleStats {
    pub mean: f64,
    /// Sample standard deviation (N - 1 denominator, 0 for a single value).
    pub std: f64,
}

impl SampleStats {
    /// Compute mean and sample standard deviation. `None` for an empty sample.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() > 1 {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        } else {
            0.0
        };

        Some(Self { mean, std })
    }
}

/// Error statistics reported by an optimizer after each step.
///
/// Errors are costs (lower is better), i.e. negated fitness values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizerReport {
    /// Steps performed so far (generations for the evolution strategy).
    pub step: usize,
    pub smallest_error: f64,
    pub highest_error: f64,
    pub mean_error: f64,
    pub error_std: f64,
    /// Parameters of the best point found so far.
    pub best_parameters: Vec<f64>,
    /// Cost function evaluations performed so far.
    pub evaluations: u64,
}

/// Reason a driver loop stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The optimizer reported convergence.
    Converged,
    /// Reached the step limit.
    MaxSteps,
    /// Reached the target error.
    TargetReached,
    /// Cancelled by user.
    Cancelled,
    /// Error occurred.
    Error(String),
}

/// Final result of a driver loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub report: OptimizerReport,
    pub stop_reason: StopReason,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
}
