//! Cost functions and batch fitness evaluation.
//!
//! The evolution strategy maximizes fitness while calibration minimizes a
//! cost, so evaluators store `fitness = -cost`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use super::error::CostError;
use super::individual::{BoundedValue, Individual};

/// Cost returned for parameter vectors outside their declared bounds.
pub const INFEASIBLE_COST: f64 = f64::MAX;

/// A scalar cost over a parameter vector. Lower is better.
pub trait CostFunction {
    /// Evaluate the cost. `Err` signals a hard failure of the underlying
    /// model, not an infeasible point (use [`INFEASIBLE_COST`] for that).
    fn cost(&self, parameters: &[f64]) -> Result<f64, CostError>;
}

impl<F> CostFunction for F
where
    F: Fn(&[f64]) -> f64,
{
    fn cost(&self, parameters: &[f64]) -> Result<f64, CostError> {
        Ok(self(parameters))
    }
}

/// Cost function wrapper that returns [`INFEASIBLE_COST`] whenever a
/// parameter leaves its declared `[min, max]` range.
#[derive(Debug, Clone)]
pub struct BoundedCost<C> {
    inner: C,
    bounds: Vec<(f64, f64)>,
}

impl<C> BoundedCost<C> {
    pub fn new(inner: C, bounds: Vec<(f64, f64)>) -> Self {
        Self { inner, bounds }
    }

    /// Take the bounds from a parameter template.
    pub fn from_parameters(inner: C, parameters: &[BoundedValue]) -> Self {
        Self::new(inner, parameters.iter().map(|p| (p.min, p.max)).collect())
    }
}

impl<C: CostFunction> CostFunction for BoundedCost<C> {
    fn cost(&self, parameters: &[f64]) -> Result<f64, CostError> {
        let out_of_bounds = parameters
            .iter()
            .zip(&self.bounds)
            .any(|(&v, &(min, max))| v < min || v > max);

        if out_of_bounds {
            Ok(INFEASIBLE_COST)
        } else {
            self.inner.cost(parameters)
        }
    }
}

/// Assigns fitness to a batch of individuals.
pub trait Evaluator {
    /// Evaluate every individual. On `Err` the whole batch is invalid.
    fn evaluate(&mut self, individuals: &mut [Individual]) -> Result<(), CostError>;
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&mut self, individuals: &mut [Individual]) -> Result<(), CostError> {
        (**self).evaluate(individuals)
    }
}

/// Sequential evaluation through a cost function.
pub struct SequentialEvaluator<C> {
    cost: C,
    evaluations: Arc<AtomicU64>,
}

impl<C: CostFunction> SequentialEvaluator<C> {
    pub fn new(cost: C) -> Self {
        Self {
            cost,
            evaluations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Share an existing evaluation counter.
    pub fn with_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.evaluations = counter;
        self
    }

    /// Handle to the number of cost evaluations performed so far.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.evaluations)
    }
}

impl<C: CostFunction> Evaluator for SequentialEvaluator<C> {
    fn evaluate(&mut self, individuals: &mut [Individual]) -> Result<(), CostError> {
        for individual in individuals.iter_mut() {
            let cost = self.cost.cost(&individual.object_values())?;
            individual.set_fitness(-cost);
            self.evaluations.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Parallel evaluation for reentrant cost functions.
///
/// Draws no random numbers, so results match [`SequentialEvaluator`].
#[cfg(not(target_arch = "wasm32"))]
pub struct ParallelEvaluator<C> {
    cost: C,
    evaluations: Arc<AtomicU64>,
}

#[cfg(not(target_arch = "wasm32"))]
impl<C: CostFunction + Sync> ParallelEvaluator<C> {
    pub fn new(cost: C) -> Self {
        Self {
            cost,
            evaluations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Share an existing evaluation counter.
    pub fn with_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.evaluations = counter;
        self
    }

    /// Handle to the number of cost evaluations performed so far.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.evaluations)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<C: CostFunction + Sync> Evaluator for ParallelEvaluator<C> {
    fn evaluate(&mut self, individuals: &mut [Individual]) -> Result<(), CostError> {
        let cost = &self.cost;
        let evaluations = &self.evaluations;

        individuals.par_iter_mut().try_for_each(|individual| {
            let value = cost.cost(&individual.object_values())?;
            individual.set_fitness(-value);
            evaluations.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(x: &[f64]) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    fn population() -> Vec<Individual> {
        (0..5)
            .map(|i| {
                Individual::new(
                    vec![BoundedValue::new(i as f64, -10.0, 10.0)],
                    vec![1.0.into()],
                    0.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_sequential_sets_negative_cost() {
        let mut evaluator = SequentialEvaluator::new(sphere);
        let counter = evaluator.counter();
        let mut pop = population();

        evaluator.evaluate(&mut pop).unwrap();

        for (i, ind) in pop.iter().enumerate() {
            assert_eq!(ind.fitness(), -((i * i) as f64));
        }
        assert_eq!(counter.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut seq = population();
        let mut par = population();

        SequentialEvaluator::new(sphere).evaluate(&mut seq).unwrap();
        let mut parallel = ParallelEvaluator::new(sphere);
        parallel.evaluate(&mut par).unwrap();

        let a: Vec<f64> = seq.iter().map(Individual::fitness).collect();
        let b: Vec<f64> = par.iter().map(Individual::fitness).collect();
        assert_eq!(a, b);
        assert_eq!(parallel.counter().load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_bounded_cost_returns_sentinel() {
        let cost = BoundedCost::new(sphere, vec![(-1.0, 1.0), (0.0, 2.0)]);
        assert_eq!(cost.cost(&[0.5, 1.0]).unwrap(), 1.25);
        assert_eq!(cost.cost(&[1.5, 1.0]).unwrap(), INFEASIBLE_COST);
        assert_eq!(cost.cost(&[0.0, -0.1]).unwrap(), INFEASIBLE_COST);
    }

    struct Failing;

    impl CostFunction for Failing {
        fn cost(&self, _parameters: &[f64]) -> Result<f64, CostError> {
            Err("simulation diverged".into())
        }
    }

    #[test]
    fn test_failure_fails_batch() {
        let mut evaluator = SequentialEvaluator::new(Failing);
        let mut pop = population();
        assert!(evaluator.evaluate(&mut pop).is_err());
    }
}
