//! (mu/rho,lambda) evolution strategy for model calibration.
//!
//! # Overview
//!
//! An [`EvolutionEngine`] is assembled from pluggable operators and driven one
//! generation at a time:
//!
//! - **Individuals** (`individual`): bounded object and strategy parameters plus fitness
//! - **Marriage** (`marriage`): random choice of `rho` parents per offspring
//! - **Recombination** (`recombination`): discrete or intermediate
//! - **Mutation** (`mutation`): self-adaptive step sizes or the 1/5 success rule
//! - **Selection** (`selection`): plus or comma survivor selection
//! - **Fitness** (`fitness`): cost functions and batch evaluators
//! - **Archive** (`archive`): the best individuals of a whole run
//!
//! Fitness is maximized and equals the negated cost.
//!
//! # Example
//!
//! ```rust,no_run
//! use orcs_calibrate::compute::evolution::{
//!     EsOperators, EvolutionEngine, InitValue, RandomInitializer, RandomSource,
//!     SequentialEvaluator,
//! };
//! use orcs_calibrate::schema::EsConfig;
//!
//! let config = EsConfig::default();
//! let evaluator = SequentialEvaluator::new(|x: &[f64]| x.iter().map(|v| v * v).sum::<f64>());
//! let mut engine = EvolutionEngine::new(
//!     EsOperators::from_config(&config),
//!     evaluator,
//!     RandomSource::new(42),
//! );
//!
//! let mut init = RandomInitializer::uniform(
//!     InitValue::random(-5.0, 5.0),
//!     2,
//!     InitValue::fixed(1.0),
//!     1,
//! );
//! engine.start_evolution_run(config.mu, config.rho, config.lambda, &mut init).unwrap();
//! for _ in 0..50 {
//!     engine.do_next_generation().unwrap();
//! }
//!
//! println!("Best fitness: {:.6}", engine.information().best_fitness);
//! ```

mod archive;
mod engine;
mod error;
mod fitness;
mod individual;
mod initialize;
mod marriage;
mod mutation;
mod recombination;
mod rng;
mod selection;

pub use archive::{ArchivedIndividual, BestIndividualArchive, load_archived_individual};
pub use engine::{EsOperators, EvolutionEngine, RunState};
pub use error::{CostError, EvolutionError, OperatorError};
#[cfg(not(target_arch = "wasm32"))]
pub use fitness::ParallelEvaluator;
pub use fitness::{
    BoundedCost, CostFunction, Evaluator, INFEASIBLE_COST, SequentialEvaluator,
};
pub use individual::{BoundedValue, Individual, descending_fitness, sort_descending};
pub use initialize::{InitValue, Initializer, RandomInitializer};
pub use marriage::Marriage;
pub use mutation::{ObjectMutation, OneFifthRule, StrategyMutation};
pub use recombination::ParameterSet;
pub use rng::RandomSource;
pub use selection::Pick;
