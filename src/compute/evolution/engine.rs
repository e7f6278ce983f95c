//! The (mu/rho,lambda) evolution strategy loop.

use log::{debug, info};

use crate::schema::{
    EsConfig, EsInformation, RecombinationKind, SampleStats, SelectionKind, validate_population,
};

use super::error::{EvolutionError, OperatorError};
use super::fitness::Evaluator;
use super::individual::{Individual, descending_fitness, sort_descending};
use super::initialize::Initializer;
use super::marriage::Marriage;
use super::mutation::{ObjectMutation, StrategyMutation};
use super::recombination::ParameterSet;
use super::rng::RandomSource;
use super::selection::Pick;

/// Lifecycle of an evolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Unstarted,
    Running,
    Terminated,
    Failed,
}

/// The configured operators of an evolution strategy.
#[derive(Debug, Clone)]
pub struct EsOperators {
    pub marriage: Marriage,
    pub strategy_recombination: RecombinationKind,
    pub object_recombination: RecombinationKind,
    pub strategy_mutation: StrategyMutation,
    pub object_mutation: ObjectMutation,
    pub selection: SelectionKind,
}

impl EsOperators {
    /// Operators described by an evolution strategy configuration.
    pub fn from_config(config: &EsConfig) -> Self {
        let strategy_mutation = StrategyMutation::from_config(&config.mutation);
        Self {
            marriage: Marriage::new(),
            strategy_recombination: config.strategy_recombination,
            object_recombination: config.object_recombination,
            object_mutation: strategy_mutation.object_mutation(),
            strategy_mutation,
            selection: config.selection,
        }
    }
}

/// Evolution engine driven one generation at a time by an external loop.
pub struct EvolutionEngine<E> {
    operators: EsOperators,
    evaluator: E,
    rng: RandomSource,
    population: Vec<Individual>,
    information: EsInformation,
    state: RunState,
}

impl<E: Evaluator> EvolutionEngine<E> {
    /// Create a new evolution engine.
    pub fn new(operators: EsOperators, evaluator: E, rng: RandomSource) -> Self {
        Self {
            operators,
            evaluator,
            rng,
            population: Vec::new(),
            information: EsInformation::default(),
            state: RunState::Unstarted,
        }
    }

    /// Create, evaluate and rank the initial population.
    pub fn start_evolution_run(
        &mut self,
        mu: usize,
        rho: usize,
        lambda: usize,
        initializer: &mut dyn Initializer,
    ) -> Result<(), EvolutionError> {
        self.population.clear();
        self.information = EsInformation {
            mu,
            rho,
            lambda,
            ..Default::default()
        };
        self.state = RunState::Failed;
        self.operators.strategy_mutation.reset();

        validate_population(mu, rho, lambda)?;

        let mut population = initializer.create_population(mu, &mut self.rng);
        if population.len() < mu {
            return Err(EvolutionError::PopulationTooSmall {
                expected: mu,
                created: population.len(),
            });
        }

        let Some(first) = population.first() else {
            return Err(EvolutionError::PopulationTooSmall {
                expected: mu,
                created: 0,
            });
        };
        let strategy_count = first.strategy_parameters().len();
        let object_count = first.object_parameters().len();

        if object_count == 0 {
            return Err(OperatorError::EmptyInput {
                operator: "initialize",
            }
            .into());
        }
        for individual in &population {
            check_shape(individual.object_parameters().len(), object_count)?;
            check_shape(individual.strategy_parameters().len(), strategy_count)?;
        }

        let needed = self.operators.strategy_mutation.strategy_count(object_count);
        if strategy_count != needed {
            return Err(OperatorError::ShapeMismatch {
                operator: "strategy mutation",
                expected: needed,
                found: strategy_count,
            }
            .into());
        }

        self.information.number_of_strategy_parameters = strategy_count;
        self.information.number_of_object_parameters = object_count;

        self.evaluator.evaluate(&mut population)?;
        sort_descending(&mut population);

        self.population = population;
        self.calculate_statistics();
        self.state = RunState::Running;

        info!(
            "Started ({}/{},{})-ES with {} object and {} strategy parameters, best fitness {:.6}",
            mu, rho, lambda, object_count, strategy_count, self.information.best_fitness
        );

        Ok(())
    }

    /// Breed, evaluate and select one generation.
    ///
    /// On error the population is left untouched and every offspring bred
    /// in this call is dropped.
    pub fn do_next_generation(&mut self) -> Result<(), EvolutionError> {
        if self.state != RunState::Running {
            return Err(EvolutionError::NotRunning);
        }

        let lambda = self.information.lambda;
        let mut offspring = Vec::with_capacity(lambda);
        let mut best_parents_fitness = Vec::with_capacity(lambda);

        for _ in 0..lambda {
            let mut parents = self.operators.marriage.select_parents(
                &self.population,
                self.information.rho,
                &mut self.rng,
            )?;
            parents.sort_by(|a, b| descending_fitness(a, b));

            let best_parent = parents.first().ok_or(OperatorError::EmptyInput {
                operator: "marriage",
            })?;
            best_parents_fitness.push(best_parent.fitness());

            let strategy = self.operators.strategy_recombination.combine(
                &parents,
                ParameterSet::Strategy,
                &mut self.rng,
            )?;
            let objects = self.operators.object_recombination.combine(
                &parents,
                ParameterSet::Object,
                &mut self.rng,
            )?;

            let strategy = self.operators.strategy_mutation.mutate(
                &strategy,
                &self.information,
                &mut self.rng,
            )?;
            let objects = self
                .operators
                .object_mutation
                .mutate(&objects, &strategy, &mut self.rng)?;

            offspring.push(Individual::new(objects, strategy, 0.0));
        }

        self.evaluator.evaluate(&mut offspring)?;

        self.information.number_of_last_successful_individuals = offspring
            .iter()
            .zip(&best_parents_fitness)
            .filter(|(child, best)| child.fitness() > **best)
            .count();

        sort_descending(&mut offspring);

        let picks = self.operators.selection.select(
            &self.population,
            &offspring,
            self.information.mu,
        )?;

        let mut parents: Vec<Option<Individual>> = std::mem::take(&mut self.population)
            .into_iter()
            .map(Some)
            .collect();
        let mut children: Vec<Option<Individual>> = offspring.into_iter().map(Some).collect();

        self.population = picks
            .into_iter()
            .filter_map(|pick| match pick {
                Pick::Parent(i) => parents.get_mut(i).and_then(Option::take),
                Pick::Offspring(i) => children.get_mut(i).and_then(Option::take),
            })
            .collect();

        self.calculate_statistics();
        self.information.current_generation += 1;

        debug!(
            "Generation {}: best {:.6}, worst {:.6}, mean {:.6}, std {:.6}, {} successful",
            self.information.current_generation,
            self.information.best_fitness,
            self.information.worst_fitness,
            self.information.mean_fitness,
            self.information.fitness_std,
            self.information.number_of_last_successful_individuals
        );

        Ok(())
    }

    /// Mark the run as finished. The final population stays readable.
    pub fn end_evolution_run(&mut self) {
        if self.state == RunState::Running {
            self.state = RunState::Terminated;
        }
    }

    /// Recompute best, worst, mean and standard deviation of the population.
    fn calculate_statistics(&mut self) {
        let (Some(best), Some(worst)) = (self.population.first(), self.population.last()) else {
            return;
        };
        self.information.best_fitness = best.fitness();
        self.information.worst_fitness = worst.fitness();

        let fitness: Vec<f64> = self.population.iter().map(Individual::fitness).collect();
        if let Some(stats) = SampleStats::from_values(&fitness) {
            self.information.mean_fitness = stats.mean;
            self.information.fitness_std = stats.std;
        }
    }

    /// Current population, best first.
    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    pub fn best_individual(&self) -> Option<&Individual> {
        self.population.first()
    }

    pub fn generation_count(&self) -> usize {
        self.information.current_generation
    }

    pub fn information(&self) -> &EsInformation {
        &self.information
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn evaluator_mut(&mut self) -> &mut E {
        &mut self.evaluator
    }
}

fn check_shape(found: usize, expected: usize) -> Result<(), OperatorError> {
    if found != expected {
        return Err(OperatorError::ShapeMismatch {
            operator: "initialize",
            expected,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::error::CostError;
    use crate::compute::evolution::fitness::SequentialEvaluator;
    use crate::compute::evolution::initialize::{InitValue, RandomInitializer};
    use crate::schema::MutationConfig;

    /// Assigns the same fitness to every evaluated individual.
    struct ConstantFitness(f64);

    impl Evaluator for ConstantFitness {
        fn evaluate(&mut self, individuals: &mut [Individual]) -> Result<(), CostError> {
            for individual in individuals {
                individual.set_fitness(self.0);
            }
            Ok(())
        }
    }

    /// Fails every batch after the first `remaining` ones.
    struct FailAfter {
        remaining: usize,
    }

    impl Evaluator for FailAfter {
        fn evaluate(&mut self, individuals: &mut [Individual]) -> Result<(), CostError> {
            if self.remaining == 0 {
                return Err("simulation failed".into());
            }
            self.remaining -= 1;
            for individual in individuals {
                individual.set_fitness(1.0);
            }
            Ok(())
        }
    }

    fn operators(selection: SelectionKind) -> EsOperators {
        EsOperators::from_config(&EsConfig {
            selection,
            strategy_recombination: RecombinationKind::Discrete,
            object_recombination: RecombinationKind::Intermediate,
            mutation: MutationConfig::OneFifthRule {
                check_interval: 2,
                learn_rate_coeff: 0.9,
            },
            ..Default::default()
        })
    }

    fn initializer() -> RandomInitializer {
        RandomInitializer::uniform(
            InitValue::random(0.0, 2.0),
            2,
            InitValue::random(0.0, 2.0),
            1,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn check_iteration<E: Evaluator>(
        es: &EvolutionEngine<E>,
        population_size: usize,
        generation: usize,
        fitness: f64,
        successful: usize,
        best: f64,
        worst: f64,
        mean: f64,
        std: f64,
    ) {
        assert_eq!(es.population().len(), population_size);
        assert_eq!(es.generation_count(), generation);
        assert!(es.population().iter().all(|i| i.fitness() == fitness));

        let info = es.information();
        assert_eq!(info.number_of_last_successful_individuals, successful);
        assert_eq!(info.best_fitness, best);
        assert_eq!(info.worst_fitness, worst);
        assert_eq!(info.mean_fitness, mean);
        assert_eq!(info.fitness_std, std);
    }

    #[test]
    fn test_plus_es() {
        let mut es = EvolutionEngine::new(
            operators(SelectionKind::Plus),
            ConstantFitness(1.0),
            RandomSource::new(42),
        );

        es.start_evolution_run(10, 2, 100, &mut initializer()).unwrap();
        assert_eq!(es.state(), RunState::Running);
        check_iteration(&es, 10, 0, 1.0, 0, 1.0, 1.0, 1.0, 0.0);

        es.evaluator_mut().0 = 0.5;
        es.do_next_generation().unwrap();
        check_iteration(&es, 10, 1, 1.0, 0, 1.0, 1.0, 1.0, 0.0);

        es.evaluator_mut().0 = 1.5;
        es.do_next_generation().unwrap();
        check_iteration(&es, 10, 2, 1.5, 100, 1.5, 1.5, 1.5, 0.0);
    }

    #[test]
    fn test_comma_es() {
        let mut es = EvolutionEngine::new(
            operators(SelectionKind::Comma),
            ConstantFitness(1.0),
            RandomSource::new(42),
        );

        es.start_evolution_run(10, 3, 50, &mut initializer()).unwrap();
        check_iteration(&es, 10, 0, 1.0, 0, 1.0, 1.0, 1.0, 0.0);

        es.evaluator_mut().0 = 0.5;
        es.do_next_generation().unwrap();
        check_iteration(&es, 10, 1, 0.5, 0, 0.5, 0.5, 0.5, 0.0);

        es.evaluator_mut().0 = 1.5;
        es.do_next_generation().unwrap();
        check_iteration(&es, 10, 2, 1.5, 50, 1.5, 1.5, 1.5, 0.0);
    }

    #[test]
    fn test_invalid_sizes_fail_start() {
        let mut es = EvolutionEngine::new(
            operators(SelectionKind::Plus),
            ConstantFitness(1.0),
            RandomSource::new(0),
        );

        let result = es.start_evolution_run(0, 2, 10, &mut initializer());
        assert!(matches!(result, Err(EvolutionError::Config(_))));
        assert_eq!(es.state(), RunState::Failed);
        assert!(matches!(
            es.do_next_generation(),
            Err(EvolutionError::NotRunning)
        ));
    }

    #[test]
    fn test_short_initializer_fails_start() {
        struct Short;
        impl Initializer for Short {
            fn create_population(
                &mut self,
                size: usize,
                _rng: &mut RandomSource,
            ) -> Vec<Individual> {
                (0..size / 2)
                    .map(|_| Individual::new(vec![0.0.into()], vec![1.0.into()], 0.0))
                    .collect()
            }
        }

        let mut es = EvolutionEngine::new(
            operators(SelectionKind::Plus),
            ConstantFitness(1.0),
            RandomSource::new(0),
        );
        let result = es.start_evolution_run(4, 2, 10, &mut Short);
        assert!(matches!(
            result,
            Err(EvolutionError::PopulationTooSmall {
                expected: 4,
                created: 2
            })
        ));
    }

    #[test]
    fn test_failed_evaluation_keeps_population() {
        let mut es = EvolutionEngine::new(
            operators(SelectionKind::Plus),
            FailAfter { remaining: 1 },
            RandomSource::new(3),
        );
        es.start_evolution_run(5, 2, 20, &mut initializer()).unwrap();
        let ids: Vec<u64> = es.population().iter().map(Individual::id).collect();

        let result = es.do_next_generation();
        assert!(matches!(result, Err(EvolutionError::Evaluation(_))));
        assert_eq!(es.generation_count(), 0);
        let after: Vec<u64> = es.population().iter().map(Individual::id).collect();
        assert_eq!(ids, after);
    }

    #[test]
    fn test_strategy_count_mismatch_fails_start() {
        let mut es = EvolutionEngine::new(
            EsOperators::from_config(&EsConfig {
                mutation: MutationConfig::MultiStd {
                    learn_rate_coeff: 1.0,
                },
                ..Default::default()
            }),
            ConstantFitness(1.0),
            RandomSource::new(0),
        );

        let mut init = RandomInitializer::uniform(
            InitValue::random(0.0, 1.0),
            3,
            InitValue::fixed(1.0),
            1,
        );
        let result = es.start_evolution_run(5, 2, 10, &mut init);
        assert!(matches!(
            result,
            Err(EvolutionError::Operator(OperatorError::ShapeMismatch {
                expected: 3,
                found: 1,
                ..
            }))
        ));
        assert_eq!(es.state(), RunState::Failed);
        assert!(es.population().is_empty());
    }

    #[test]
    fn test_no_object_parameters_fails_start() {
        let mut es = EvolutionEngine::new(
            operators(SelectionKind::Plus),
            ConstantFitness(1.0),
            RandomSource::new(0),
        );

        let mut init = RandomInitializer::uniform(
            InitValue::random(0.0, 1.0),
            0,
            InitValue::fixed(1.0),
            1,
        );
        let result = es.start_evolution_run(5, 2, 10, &mut init);
        assert!(matches!(
            result,
            Err(EvolutionError::Operator(OperatorError::EmptyInput { .. }))
        ));
        assert_eq!(es.state(), RunState::Failed);
    }

    #[test]
    fn test_failed_operator_keeps_population() {
        // One step size, but every object coordinate wants its own.
        let mut operators = operators(SelectionKind::Plus);
        operators.object_mutation = ObjectMutation::MultiDensity;

        let mut es = EvolutionEngine::new(operators, ConstantFitness(1.0), RandomSource::new(4));
        es.start_evolution_run(5, 2, 20, &mut initializer()).unwrap();
        let ids: Vec<u64> = es.population().iter().map(Individual::id).collect();
        let best = es.information().best_fitness;

        let result = es.do_next_generation();
        assert!(matches!(
            result,
            Err(EvolutionError::Operator(OperatorError::ShapeMismatch { .. }))
        ));
        assert_eq!(es.generation_count(), 0);
        assert_eq!(es.state(), RunState::Running);
        assert_eq!(es.information().best_fitness, best);
        let after: Vec<u64> = es.population().iter().map(Individual::id).collect();
        assert_eq!(ids, after);
    }

    #[test]
    fn test_restart_resets_run() {
        let mut es = EvolutionEngine::new(
            operators(SelectionKind::Plus),
            ConstantFitness(1.0),
            RandomSource::new(8),
        );
        es.start_evolution_run(4, 2, 8, &mut initializer()).unwrap();
        for _ in 0..3 {
            es.do_next_generation().unwrap();
        }
        es.end_evolution_run();

        es.start_evolution_run(6, 2, 12, &mut initializer()).unwrap();
        assert_eq!(es.state(), RunState::Running);
        check_iteration(&es, 6, 0, 1.0, 0, 1.0, 1.0, 1.0, 0.0);
    }

    #[test]
    fn test_sphere_best_fitness_never_decreases_with_plus() {
        let config = EsConfig {
            mu: 5,
            rho: 2,
            lambda: 30,
            mutation: MutationConfig::MultiStd {
                learn_rate_coeff: 1.0,
            },
            ..Default::default()
        };
        let operators = EsOperators::from_config(&config);
        let evaluator = SequentialEvaluator::new(|x: &[f64]| x.iter().map(|v| v * v).sum::<f64>());
        let counter = evaluator.counter();
        let mut es = EvolutionEngine::new(operators, evaluator, RandomSource::new(7));

        let mut init = RandomInitializer::uniform(
            InitValue::random(-5.0, 5.0),
            3,
            InitValue::defined(1.0, 1e-6, 10.0),
            3,
        );
        es.start_evolution_run(5, 2, 30, &mut init).unwrap();
        let initial_best = es.information().best_fitness;

        let mut previous = initial_best;
        for _ in 0..40 {
            es.do_next_generation().unwrap();
            let best = es.information().best_fitness;
            assert!(best >= previous);
            previous = best;
        }

        assert!(previous > initial_best);
        assert!(previous > -0.5);
        assert_eq!(
            counter.load(std::sync::atomic::Ordering::Relaxed),
            5 + 40 * 30
        );

        es.end_evolution_run();
        assert_eq!(es.state(), RunState::Terminated);
        assert_eq!(es.best_individual().map(|b| b.fitness()), Some(previous));
    }
}
