//! Individuals of an evolution strategy population.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

static NEXT_INDIVIDUAL_ID: AtomicU64 = AtomicU64::new(0);

/// A parameter value together with its declared bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedValue {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl BoundedValue {
    /// Create a bounded value.
    pub fn new(value: f64, min: f64, max: f64) -> Self {
        Self { value, min, max }
    }

    /// Value with the widest representable bounds.
    pub fn unbounded(value: f64) -> Self {
        Self {
            value,
            min: f64::MIN,
            max: f64::MAX,
        }
    }

    /// Same bounds, different value.
    pub fn with_value(self, value: f64) -> Self {
        Self { value, ..self }
    }

    /// Clamp the value into `[min, max]`.
    pub fn clipped(self) -> Self {
        let value = if self.value < self.min {
            self.min
        } else if self.value > self.max {
            self.max
        } else {
            self.value
        };
        Self { value, ..self }
    }

    /// Whether the value lies within its bounds.
    pub fn in_bounds(&self) -> bool {
        self.value >= self.min && self.value <= self.max
    }
}

impl From<f64> for BoundedValue {
    fn from(value: f64) -> Self {
        Self::unbounded(value)
    }
}

/// One candidate solution: object parameters under calibration plus the
/// self-adaptive strategy parameters used to mutate them.
#[derive(Debug, Clone)]
pub struct Individual {
    id: u64,
    object_parameters: Vec<BoundedValue>,
    strategy_parameters: Vec<BoundedValue>,
    fitness: f64,
}

impl Individual {
    /// Create an individual with a fresh unique id.
    pub fn new(
        object_parameters: Vec<BoundedValue>,
        strategy_parameters: Vec<BoundedValue>,
        fitness: f64,
    ) -> Self {
        Self {
            id: NEXT_INDIVIDUAL_ID.fetch_add(1, AtomicOrdering::Relaxed),
            object_parameters,
            strategy_parameters,
            fitness,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn object_parameters(&self) -> &[BoundedValue] {
        &self.object_parameters
    }

    pub fn strategy_parameters(&self) -> &[BoundedValue] {
        &self.strategy_parameters
    }

    /// Plain object parameter values, as handed to a cost function.
    pub fn object_values(&self) -> Vec<f64> {
        self.object_parameters.iter().map(|p| p.value).collect()
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }
}

/// Descending fitness order for sorting. Incomparable values (NaN) compare equal.
pub fn descending_fitness(a: &Individual, b: &Individual) -> Ordering {
    b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal)
}

/// Stable sort by fitness, best first.
pub fn sort_descending(individuals: &mut [Individual]) {
    individuals.sort_by(descending_fitness);
}
