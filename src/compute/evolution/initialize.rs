//! Creation of the initial population.

use crate::schema::{ParameterConfig, ParameterInit};

use super::individual::{BoundedValue, Individual};
use super::rng::RandomSource;

/// Initial-value policy of a single parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitValue {
    /// Drawn uniformly from `[min, max]`; the bounds are kept on the parameter.
    Random { min: f64, max: f64 },
    /// Fixed value with declared bounds.
    Defined(BoundedValue),
}

impl InitValue {
    pub fn random(min: f64, max: f64) -> Self {
        Self::Random { min, max }
    }

    pub fn defined(value: f64, min: f64, max: f64) -> Self {
        Self::Defined(BoundedValue::new(value, min, max))
    }

    /// Fixed value without bounds.
    pub fn fixed(value: f64) -> Self {
        Self::Defined(BoundedValue::unbounded(value))
    }

    fn draw(&self, rng: &mut RandomSource) -> BoundedValue {
        match *self {
            InitValue::Random { min, max } => BoundedValue::new(rng.uniform(min, max), min, max),
            InitValue::Defined(value) => value,
        }
    }
}

impl From<&ParameterConfig> for InitValue {
    fn from(p: &ParameterConfig) -> Self {
        match p.init {
            ParameterInit::Random => Self::random(p.min, p.max),
            ParameterInit::Value(v) => Self::defined(v, p.min, p.max),
        }
    }
}

/// Source of the initial population of an evolution run.
pub trait Initializer {
    /// Create `size` individuals with fitness 0.
    fn create_population(&mut self, size: usize, rng: &mut RandomSource) -> Vec<Individual>;
}

/// Initializer drawing every parameter from its own [`InitValue`] policy.
#[derive(Debug, Clone)]
pub struct RandomInitializer {
    object: Vec<InitValue>,
    strategy: Vec<InitValue>,
}

impl RandomInitializer {
    pub fn new(object: Vec<InitValue>, strategy: Vec<InitValue>) -> Self {
        Self { object, strategy }
    }

    /// Same policy for every object parameter and every strategy parameter.
    pub fn uniform(
        object: InitValue,
        object_count: usize,
        strategy: InitValue,
        strategy_count: usize,
    ) -> Self {
        Self::new(vec![object; object_count], vec![strategy; strategy_count])
    }

    /// Object parameters from configuration, all strategy parameters fixed
    /// at `init_strategy_parameter`.
    pub fn from_parameters(
        parameters: &[ParameterConfig],
        strategy_count: usize,
        init_strategy_parameter: f64,
    ) -> Self {
        Self::new(
            parameters.iter().map(InitValue::from).collect(),
            vec![InitValue::fixed(init_strategy_parameter); strategy_count],
        )
    }
}

impl Initializer for RandomInitializer {
    fn create_population(&mut self, size: usize, rng: &mut RandomSource) -> Vec<Individual> {
        (0..size)
            .map(|_| {
                let object = self.object.iter().map(|v| v.draw(rng)).collect();
                let strategy = self.strategy.iter().map(|v| v.draw(rng)).collect();
                Individual::new(object, strategy, 0.0)
            })
            .collect()
    }
}
