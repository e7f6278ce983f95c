//! Model parameter calibration.
//!
//! This crate calibrates the free parameters of a model against a scalar
//! cost (the model error). Two stepwise optimizers are provided: a
//! (mu/rho,lambda) evolution strategy with self-adaptive or 1/5-rule step
//! sizes, and Powell's conjugate-direction method over Brent line searches.
//!
//! # Architecture
//!
//! The crate is split into three main modules:
//!
//! - `schema`: Configuration types and run statistics
//! - `compute`: The algorithms (evolution strategy, line search minimizers, test functions)
//! - `optimizer`: Stepwise drivers that turn a configuration into a calibration run
//!
//! # Example
//!
//! ```rust,no_run
//! use orcs_calibrate::{
//!     compute::benchmark::Benchmark,
//!     optimizer::{OptimizationRun, create_optimizer},
//!     schema::OptimizerConfig,
//! };
//!
//! // Create configuration
//! let config = OptimizerConfig::default();
//!
//! // Build the optimizer for a cost function and run it
//! let mut optimizer = create_optimizer(&config, Benchmark::Sphere).unwrap();
//! let outcome = OptimizationRun::new(config.run.clone()).run(optimizer.as_mut());
//!
//! println!("Smallest error: {}", outcome.report.smallest_error);
//! ```

pub mod compute;
pub mod optimizer;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{CostError, CostFunction, EvolutionEngine};
pub use compute::minimize::PowellMultiDimMinimizer;
pub use optimizer::{ModelOptimizer, OptimizationRun, OptimizerError, create_optimizer};
pub use schema::{OptimizerConfig, OptimizerReport, RunOutcome, StopReason};
