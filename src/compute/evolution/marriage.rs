//! Parent selection for a single offspring.

use super::error::OperatorError;
use super::individual::Individual;
use super::rng::RandomSource;

/// Uniform marriage: picks `rho` parents from the population with replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct Marriage;

impl Marriage {
    pub fn new() -> Self {
        Self
    }

    /// Select the parents of one offspring.
    pub fn select_parents<'a>(
        &self,
        population: &'a [Individual],
        rho: usize,
        rng: &mut RandomSource,
    ) -> Result<Vec<&'a Individual>, OperatorError> {
        if population.is_empty() || rho == 0 {
            return Err(OperatorError::EmptyInput {
                operator: "marriage",
            });
        }

        Ok((0..rho)
            .map(|_| &population[rng.index(population.len())])
            .collect())
    }
}
