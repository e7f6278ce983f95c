//! Evolution strategy driver.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::info;

use crate::compute::evolution::{
    BestIndividualArchive, BoundedCost, CostFunction, EsOperators, Evaluator, EvolutionEngine,
    RandomInitializer, RandomSource, SequentialEvaluator,
};
use crate::schema::{ConfigError, EsConfig, OptimizerReport, ParameterConfig, SelectionKind};

use super::{ModelOptimizer, OptimizerError};

type BoxedEngine = EvolutionEngine<Box<dyn Evaluator>>;

/// Calibrates parameters with a (mu/rho,lambda) evolution strategy.
///
/// Every step breeds one generation. The strategy never decides on its own
/// that it has finished; the driving loop stops it.
pub struct EsOptimizer<C> {
    parameters: Vec<ParameterConfig>,
    config: EsConfig,
    cost: C,
    engine: Option<BoxedEngine>,
    archive: BestIndividualArchive,
    output_dir: Option<PathBuf>,
    evaluations: Arc<AtomicU64>,
    report: OptimizerReport,
}

impl<C> EsOptimizer<C>
where
    C: CostFunction + Clone + Send + Sync + 'static,
{
    pub fn new(
        parameters: Vec<ParameterConfig>,
        config: EsConfig,
        cost: C,
    ) -> Result<Self, ConfigError> {
        if parameters.is_empty() {
            return Err(ConfigError::NoParameters);
        }
        config.validate()?;

        Ok(Self {
            parameters,
            archive: BestIndividualArchive::new(config.number_of_result_files),
            config,
            cost,
            engine: None,
            output_dir: None,
            evaluations: Arc::new(AtomicU64::new(0)),
            report: OptimizerReport::default(),
        })
    }

    /// Export archived individuals below `dir/best_individuals`.
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    /// The best individuals of the run so far.
    pub fn archive(&self) -> &BestIndividualArchive {
        &self.archive
    }

    pub fn engine(&self) -> Option<&BoxedEngine> {
        self.engine.as_ref()
    }

    fn evaluator(&self) -> Box<dyn Evaluator> {
        let bounds = self.parameters.iter().map(|p| (p.min, p.max)).collect();
        let cost = BoundedCost::new(self.cost.clone(), bounds);
        let counter = Arc::clone(&self.evaluations);

        if self.config.parallel_evaluation {
            #[cfg(not(target_arch = "wasm32"))]
            {
                use crate::compute::evolution::ParallelEvaluator;
                return Box::new(ParallelEvaluator::new(cost).with_counter(counter));
            }
            #[cfg(target_arch = "wasm32")]
            log::warn!("Parallel evaluation is unavailable here, evaluating sequentially");
        }

        Box::new(SequentialEvaluator::new(cost).with_counter(counter))
    }

    /// Error statistics are the negated fitness statistics.
    fn update_report(&mut self) {
        let Some(engine) = &self.engine else {
            return;
        };
        let info = engine.information();

        self.report = OptimizerReport {
            step: info.current_generation,
            smallest_error: -info.best_fitness,
            highest_error: -info.worst_fitness,
            mean_error: -info.mean_fitness,
            error_std: info.fitness_std,
            best_parameters: engine
                .best_individual()
                .map(|best| best.object_values())
                .unwrap_or_default(),
            evaluations: self.evaluations.load(Ordering::Relaxed),
        };
    }

    fn save_best_individuals(&mut self) -> Result<(), OptimizerError> {
        let Some(engine) = &self.engine else {
            return Err(OptimizerError::NotStarted);
        };
        self.archive
            .merge(engine.population(), engine.generation_count())?;
        Ok(())
    }
}

impl<C> ModelOptimizer for EsOptimizer<C>
where
    C: CostFunction + Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "MuSlashRhoLambdaES"
    }

    fn optimization_start(&mut self) -> Result<(), OptimizerError> {
        let operators = EsOperators::from_config(&self.config);
        let strategy_count = operators
            .strategy_mutation
            .strategy_count(self.parameters.len());

        let rng = match self.config.random_seed {
            Some(seed) => RandomSource::new(seed),
            None => RandomSource::random(),
        };

        self.evaluations.store(0, Ordering::Relaxed);
        let mut engine = EvolutionEngine::new(operators, self.evaluator(), rng);
        let mut initializer = RandomInitializer::from_parameters(
            &self.parameters,
            strategy_count,
            self.config.init_strategy_parameter,
        );

        engine.start_evolution_run(
            self.config.mu,
            self.config.rho,
            self.config.lambda,
            &mut initializer,
        )?;

        let archive = BestIndividualArchive::new(self.config.number_of_result_files);
        self.archive = match &self.output_dir {
            Some(dir) => archive.with_output_dir(dir.join("best_individuals"))?,
            None => archive,
        };

        info!(
            "{}: ({}/{}{}{})-ES, {:?} strategy and {:?} object recombination, {:?}",
            self.name(),
            self.config.mu,
            self.config.rho,
            match self.config.selection {
                SelectionKind::Plus => "+",
                SelectionKind::Comma => ",",
            },
            self.config.lambda,
            self.config.strategy_recombination,
            self.config.object_recombination,
            self.config.mutation,
        );

        self.engine = Some(engine);
        self.save_best_individuals()?;
        self.update_report();
        Ok(())
    }

    fn do_next_optimization_step(&mut self) -> Result<bool, OptimizerError> {
        let engine = self.engine.as_mut().ok_or(OptimizerError::NotStarted)?;
        engine.do_next_generation()?;

        self.update_report();
        self.save_best_individuals()?;
        Ok(false)
    }

    fn optimization_end(&mut self) -> Result<(), OptimizerError> {
        if let Some(engine) = self.engine.as_mut() {
            engine.end_evolution_run();
        }
        Ok(())
    }

    fn report(&self) -> OptimizerReport {
        self.report.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::benchmark::{Benchmark, sphere};
    use crate::compute::evolution::{CostError, RunState};
    use crate::schema::{MutationConfig, ParameterInit};

    fn parameters(n: usize) -> Vec<ParameterConfig> {
        (0..n)
            .map(|i| ParameterConfig {
                name: format!("p{}", i),
                min: -5.0,
                max: 5.0,
                init: ParameterInit::Random,
            })
            .collect()
    }

    fn config(mutation: MutationConfig) -> EsConfig {
        EsConfig {
            mu: 5,
            rho: 2,
            lambda: 35,
            mutation,
            number_of_result_files: 3,
            random_seed: Some(11),
            ..Default::default()
        }
    }

    fn run_steps<C>(optimizer: &mut EsOptimizer<C>, steps: usize)
    where
        C: CostFunction + Clone + Send + Sync + 'static,
    {
        optimizer.optimization_start().unwrap();
        for _ in 0..steps {
            assert!(!optimizer.do_next_optimization_step().unwrap());
        }
        optimizer.optimization_end().unwrap();
    }

    #[test]
    fn test_report_is_negated_fitness() {
        let mut optimizer = EsOptimizer::new(
            parameters(3),
            config(MutationConfig::default()),
            Benchmark::Sphere,
        )
        .unwrap();
        run_steps(&mut optimizer, 25);

        let report = optimizer.report();
        let info = optimizer.engine().unwrap().information();
        assert_eq!(report.step, 25);
        assert_eq!(report.smallest_error, -info.best_fitness);
        assert_eq!(report.highest_error, -info.worst_fitness);
        assert_eq!(report.mean_error, -info.mean_fitness);
        assert!(report.smallest_error <= report.mean_error);
        assert!(report.mean_error <= report.highest_error);
        assert_eq!(report.evaluations, 5 + 25 * 35);
        assert_eq!(sphere(&report.best_parameters), report.smallest_error);
        assert_eq!(
            optimizer.engine().unwrap().state(),
            RunState::Terminated
        );
    }

    #[test]
    fn test_every_mutation_scheme_improves() {
        for mutation in [
            MutationConfig::SingleStd {
                learn_rate_coeff: 1.0,
            },
            MutationConfig::MultiStd {
                learn_rate_coeff: 1.0,
            },
            MutationConfig::OneFifthRule {
                check_interval: 5,
                learn_rate_coeff: 0.85,
            },
        ] {
            let mut optimizer =
                EsOptimizer::new(parameters(2), config(mutation), Benchmark::Sphere).unwrap();
            optimizer.optimization_start().unwrap();
            let initial = optimizer.report().smallest_error;
            for _ in 0..40 {
                optimizer.do_next_optimization_step().unwrap();
            }
            assert!(optimizer.report().smallest_error < initial, "{:?}", mutation);
        }
    }

    #[test]
    fn test_multi_std_uses_one_strategy_parameter_per_object() {
        let mut optimizer = EsOptimizer::new(
            parameters(4),
            config(MutationConfig::MultiStd {
                learn_rate_coeff: 1.0,
            }),
            Benchmark::Sphere,
        )
        .unwrap();
        optimizer.optimization_start().unwrap();
        let info = optimizer.engine().unwrap().information();
        assert_eq!(info.number_of_object_parameters, 4);
        assert_eq!(info.number_of_strategy_parameters, 4);
    }

    #[test]
    fn test_archive_tracks_best_errors() {
        let mut optimizer = EsOptimizer::new(
            parameters(2),
            EsConfig {
                selection: SelectionKind::Comma,
                ..config(MutationConfig::default())
            },
            Benchmark::Sphere,
        )
        .unwrap();
        run_steps(&mut optimizer, 15);

        let archive = optimizer.archive();
        assert_eq!(archive.len(), 3);
        let errors: Vec<f64> = archive.entries().iter().map(|e| e.error).collect();
        assert!(errors.windows(2).all(|w| w[0] <= w[1]));
        // Comma selection may lose its best individual, the archive does not.
        assert!(errors[0] <= optimizer.report().smallest_error);
    }

    #[test]
    fn test_archive_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut optimizer = EsOptimizer::new(
            parameters(2),
            config(MutationConfig::default()),
            Benchmark::Sphere,
        )
        .unwrap()
        .with_output_dir(Some(dir.path().to_path_buf()));
        run_steps(&mut optimizer, 5);

        let files = std::fs::read_dir(dir.path().join("best_individuals"))
            .unwrap()
            .count();
        assert_eq!(files, 3);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let run = |parallel: bool| {
            let mut optimizer = EsOptimizer::new(
                parameters(3),
                EsConfig {
                    parallel_evaluation: parallel,
                    ..config(MutationConfig::default())
                },
                Benchmark::Rosenbrock,
            )
            .unwrap();
            run_steps(&mut optimizer, 10);
            optimizer.report()
        };
        assert_eq!(run(false), run(true));
    }

    #[test]
    fn test_cost_failure_stops_step() {
        #[derive(Clone)]
        struct Failing;
        impl CostFunction for Failing {
            fn cost(&self, _: &[f64]) -> Result<f64, CostError> {
                Err("model crashed".into())
            }
        }

        let mut optimizer =
            EsOptimizer::new(parameters(1), config(MutationConfig::default()), Failing).unwrap();
        assert!(matches!(
            optimizer.optimization_start(),
            Err(OptimizerError::Evolution(_))
        ));
        assert!(matches!(
            optimizer.do_next_optimization_step(),
            Err(OptimizerError::NotStarted)
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = EsOptimizer::new(
            parameters(2),
            EsConfig {
                mu: 10,
                lambda: 5,
                selection: SelectionKind::Comma,
                ..Default::default()
            },
            Benchmark::Sphere,
        );
        assert!(matches!(
            result,
            Err(ConfigError::TooFewOffspring { mu: 10, lambda: 5 })
        ));
    }
}
