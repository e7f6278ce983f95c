//! Self-adaptive mutation of strategy and object parameters.
//!
//! Strategy parameters are mutated first; the object parameters of the
//! offspring are then perturbed with the *new* step sizes.

use log::debug;

use crate::schema::{EsInformation, MutationConfig};

use super::error::OperatorError;
use super::individual::BoundedValue;
use super::rng::RandomSource;

/// Success ratio targeted by Rechenberg's rule.
const ONE_FIFTH: f64 = 0.2;

/// Mutation of the strategy parameter vector (the step sizes).
#[derive(Debug, Clone)]
pub enum StrategyMutation {
    /// One step size, log-normal self-adaptation.
    SingleStd { learn_rate_coeff: f64 },
    /// One step size per object parameter, global plus per-coordinate learning rates.
    MultiStd { learn_rate_coeff: f64 },
    /// One step size adapted by the observed offspring success ratio.
    OneFifthRule(OneFifthRule),
}

impl StrategyMutation {
    pub fn from_config(config: &MutationConfig) -> Self {
        match *config {
            MutationConfig::SingleStd { learn_rate_coeff } => Self::SingleStd { learn_rate_coeff },
            MutationConfig::MultiStd { learn_rate_coeff } => Self::MultiStd { learn_rate_coeff },
            MutationConfig::OneFifthRule {
                check_interval,
                learn_rate_coeff,
            } => Self::OneFifthRule(OneFifthRule::new(check_interval, learn_rate_coeff)),
        }
    }

    /// The object mutation that pairs with this strategy mutation.
    pub fn object_mutation(&self) -> ObjectMutation {
        match self {
            Self::MultiStd { .. } => ObjectMutation::MultiDensity,
            Self::SingleStd { .. } | Self::OneFifthRule(_) => ObjectMutation::SingleDensity,
        }
    }

    /// Number of strategy parameters needed for `object_count` object parameters.
    pub fn strategy_count(&self, object_count: usize) -> usize {
        match self {
            Self::MultiStd { .. } => object_count,
            Self::SingleStd { .. } | Self::OneFifthRule(_) => 1,
        }
    }

    /// Forget adaptation state gathered during a previous run.
    pub fn reset(&mut self) {
        if let Self::OneFifthRule(rule) = self {
            *rule = OneFifthRule::new(rule.check_interval, rule.learn_rate_coeff);
        }
    }

    /// Mutate a recombined strategy vector. Results are clipped to their bounds.
    pub fn mutate(
        &mut self,
        strategy: &[BoundedValue],
        info: &EsInformation,
        rng: &mut RandomSource,
    ) -> Result<Vec<BoundedValue>, OperatorError> {
        if strategy.is_empty() {
            return Err(OperatorError::EmptyInput {
                operator: "strategy mutation",
            });
        }

        let mutated = match self {
            Self::SingleStd { learn_rate_coeff } => {
                let factor = (*learn_rate_coeff * rng.standard_normal()).exp();
                strategy
                    .iter()
                    .map(|s| s.with_value(s.value * factor).clipped())
                    .collect()
            }
            Self::MultiStd { learn_rate_coeff } => {
                let n = strategy.len() as f64;
                let global_rate = *learn_rate_coeff / (2.0 * n).sqrt();
                let local_rate = *learn_rate_coeff / (2.0 * n.sqrt()).sqrt();
                let global = global_rate * rng.standard_normal();
                strategy
                    .iter()
                    .map(|s| {
                        let local = local_rate * rng.standard_normal();
                        s.with_value(s.value * (global + local).exp()).clipped()
                    })
                    .collect()
            }
            Self::OneFifthRule(rule) => {
                let factor = rule.factor_for(info);
                strategy
                    .iter()
                    .map(|s| s.with_value(s.value * factor).clipped())
                    .collect()
            }
        };

        Ok(mutated)
    }
}

/// State of Rechenberg's 1/5 success rule.
///
/// Successes and offspring counts of completed generations are accumulated;
/// once `check_interval` generations have been observed, the step size of
/// every offspring bred in the current generation is divided by
/// `learn_rate_coeff` (ratio above 1/5) or multiplied by it (ratio below).
#[derive(Debug, Clone)]
pub struct OneFifthRule {
    check_interval: usize,
    learn_rate_coeff: f64,
    last_generation: Option<usize>,
    observed_generations: usize,
    successes: usize,
    offspring: usize,
    factor: f64,
}

impl OneFifthRule {
    pub fn new(check_interval: usize, learn_rate_coeff: f64) -> Self {
        Self {
            check_interval: check_interval.max(1),
            learn_rate_coeff,
            last_generation: None,
            observed_generations: 0,
            successes: 0,
            offspring: 0,
            factor: 1.0,
        }
    }

    /// Multiplier to apply to offspring of the generation described by `info`.
    fn factor_for(&mut self, info: &EsInformation) -> f64 {
        if self.last_generation == Some(info.current_generation) {
            return self.factor;
        }
        self.last_generation = Some(info.current_generation);
        self.factor = 1.0;

        // Generation 0 has no preceding offspring.
        if info.current_generation == 0 {
            return self.factor;
        }

        self.observed_generations += 1;
        self.successes += info.number_of_last_successful_individuals;
        self.offspring += info.lambda;

        if self.observed_generations >= self.check_interval {
            let ratio = if self.offspring == 0 {
                0.0
            } else {
                self.successes as f64 / self.offspring as f64
            };

            if ratio > ONE_FIFTH {
                self.factor = 1.0 / self.learn_rate_coeff;
            } else if ratio < ONE_FIFTH {
                self.factor = self.learn_rate_coeff;
            }

            debug!(
                "1/5 rule at generation {}: success ratio {:.3}, step factor {:.3}",
                info.current_generation, ratio, self.factor
            );

            self.observed_generations = 0;
            self.successes = 0;
            self.offspring = 0;
        }

        self.factor
    }
}

/// Mutation of the object parameter vector using the mutated step sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectMutation {
    /// Every coordinate uses the single step size `strategy[0]`.
    SingleDensity,
    /// Coordinate `i` uses step size `strategy[i]`.
    MultiDensity,
}

impl ObjectMutation {
    pub fn mutate(
        self,
        objects: &[BoundedValue],
        strategy: &[BoundedValue],
        rng: &mut RandomSource,
    ) -> Result<Vec<BoundedValue>, OperatorError> {
        if objects.is_empty() || strategy.is_empty() {
            return Err(OperatorError::EmptyInput {
                operator: "object mutation",
            });
        }

        if self == Self::MultiDensity && strategy.len() != objects.len() {
            return Err(OperatorError::ShapeMismatch {
                operator: "object mutation",
                expected: objects.len(),
                found: strategy.len(),
            });
        }

        Ok(objects
            .iter()
            .enumerate()
            .map(|(i, o)| {
                let sigma = match self {
                    Self::SingleDensity => strategy[0].value,
                    Self::MultiDensity => strategy[i].value,
                };
                o.with_value(o.value + sigma * rng.standard_normal())
                    .clipped()
            })
            .collect())
    }
}
