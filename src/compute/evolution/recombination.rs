//! Recombination of parent parameter vectors into one offspring vector.

use crate::schema::RecombinationKind;

use super::error::OperatorError;
use super::individual::{BoundedValue, Individual};
use super::rng::RandomSource;

/// Which parameter vector of the parents is recombined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSet {
    Strategy,
    Object,
}

impl ParameterSet {
    fn of(self, individual: &Individual) -> &[BoundedValue] {
        match self {
            ParameterSet::Strategy => individual.strategy_parameters(),
            ParameterSet::Object => individual.object_parameters(),
        }
    }
}

impl RecombinationKind {
    /// Produce one offspring parameter vector from `parents`.
    ///
    /// Discrete copies value and bounds of a randomly chosen parent per index.
    /// Intermediate averages the values and keeps the first parent's bounds.
    pub fn combine(
        self,
        parents: &[&Individual],
        set: ParameterSet,
        rng: &mut RandomSource,
    ) -> Result<Vec<BoundedValue>, OperatorError> {
        let Some(first) = parents.first() else {
            return Err(OperatorError::EmptyInput {
                operator: "recombination",
            });
        };

        let len = set.of(first).len();
        if let Some(other) = parents.iter().find(|p| set.of(p).len() != len) {
            return Err(OperatorError::ShapeMismatch {
                operator: "recombination",
                expected: len,
                found: set.of(other).len(),
            });
        }

        let combined = match self {
            RecombinationKind::Discrete => (0..len)
                .map(|i| set.of(parents[rng.index(parents.len())])[i])
                .collect(),
            RecombinationKind::Intermediate => {
                let count = parents.len() as f64;
                set.of(first)
                    .iter()
                    .enumerate()
                    .map(|(i, template)| {
                        let sum: f64 = parents.iter().map(|p| set.of(p)[i].value).sum();
                        template.with_value(sum / count)
                    })
                    .collect()
            }
        };

        Ok(combined)
    }
}
