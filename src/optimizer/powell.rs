//! Powell minimizer driver.

use std::fs;
use std::path::PathBuf;

use log::info;
use serde::Serialize;

use crate::compute::evolution::{BoundedCost, CostFunction};
use crate::compute::minimize::{BrentOneDimMinimizer, PowellMultiDimMinimizer};
use crate::schema::{ConfigError, OptimizerReport, ParameterConfig, PowellConfig};

use super::{ModelOptimizer, OptimizerError};

/// Calibrates parameters with Powell's method, one line search per step.
///
/// The model error is the function value of the minimizer's current best
/// point. The run finishes when the minimizer converges.
pub struct PowellOptimizer<C> {
    parameters: Vec<ParameterConfig>,
    config: PowellConfig,
    cost: C,
    minimizer: PowellMultiDimMinimizer<BoundedCost<C>>,
    output_dir: Option<PathBuf>,
    started: bool,
    steps: usize,
    report: OptimizerReport,
}

/// Current parameter values as written after each step.
#[derive(Debug, Serialize)]
struct ParameterSnapshot<'a> {
    step: usize,
    model_error: f64,
    parameters: Vec<(&'a str, f64)>,
}

impl<C: CostFunction + Clone> PowellOptimizer<C> {
    pub fn new(
        parameters: Vec<ParameterConfig>,
        config: PowellConfig,
        cost: C,
    ) -> Result<Self, ConfigError> {
        if parameters.is_empty() {
            return Err(ConfigError::NoParameters);
        }
        config.validate()?;

        let line_minimizer =
            BrentOneDimMinimizer::new(config.line_tolerance, config.line_max_iterations);
        Ok(Self {
            parameters,
            minimizer: PowellMultiDimMinimizer::new(line_minimizer, config.tolerance),
            config,
            cost,
            output_dir: None,
            started: false,
            steps: 0,
            report: OptimizerReport::default(),
        })
    }

    /// Write the current parameters to `dir/parameters.json` after each step.
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn minimizer(&self) -> &PowellMultiDimMinimizer<BoundedCost<C>> {
        &self.minimizer
    }

    fn update_report(&mut self) {
        let point = self.minimizer.minimum_point();
        self.report = OptimizerReport {
            step: self.steps,
            smallest_error: point.y,
            highest_error: point.y,
            mean_error: point.y,
            error_std: 0.0,
            best_parameters: point.x.clone(),
            evaluations: self.minimizer.evaluations(),
        };
    }

    fn save_parameters(&self) -> Result<(), OptimizerError> {
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };

        let point = self.minimizer.minimum_point();
        let snapshot = ParameterSnapshot {
            step: self.steps,
            model_error: point.y,
            parameters: self
                .parameters
                .iter()
                .map(|p| p.name.as_str())
                .zip(point.x.iter().copied())
                .collect(),
        };

        fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(&snapshot).map_err(std::io::Error::from)?;
        fs::write(dir.join("parameters.json"), json)?;
        Ok(())
    }
}

impl<C: CostFunction + Clone> ModelOptimizer for PowellOptimizer<C> {
    fn name(&self) -> &'static str {
        "Powell"
    }

    fn optimization_start(&mut self) -> Result<(), OptimizerError> {
        let start: Vec<f64> = self.parameters.iter().map(|p| p.start_value()).collect();
        let bounds = self.parameters.iter().map(|p| (p.min, p.max)).collect();

        self.minimizer
            .minimization_start(BoundedCost::new(self.cost.clone(), bounds), start)?;
        self.started = true;
        self.steps = 0;

        info!(
            "{}: tolerance {}, line search tolerance {}, line search max iterations {}",
            self.name(),
            self.config.tolerance,
            self.config.line_tolerance,
            self.config.line_max_iterations
        );

        self.update_report();
        Ok(())
    }

    fn do_next_optimization_step(&mut self) -> Result<bool, OptimizerError> {
        if !self.started {
            return Err(OptimizerError::NotStarted);
        }

        let finished = self.minimizer.do_minimization_step()?;
        self.steps += 1;
        if finished {
            info!("{}: found minimum", self.name());
        }

        self.update_report();
        self.save_parameters()?;
        Ok(finished)
    }

    fn optimization_end(&mut self) -> Result<(), OptimizerError> {
        self.minimizer.minimization_end();
        self.started = false;
        Ok(())
    }

    fn report(&self) -> OptimizerReport {
        self.report.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::benchmark::Benchmark;
    use crate::compute::evolution::INFEASIBLE_COST;
    use crate::schema::ParameterInit;

    fn parameter(name: &str, min: f64, max: f64, init: ParameterInit) -> ParameterConfig {
        ParameterConfig {
            name: name.to_string(),
            min,
            max,
            init,
        }
    }

    fn quadratic_parameters() -> Vec<ParameterConfig> {
        vec![
            parameter("x", -5.0, 5.0, ParameterInit::Value(0.0)),
            parameter("y", -5.0, 5.0, ParameterInit::Value(0.0)),
        ]
    }

    #[test]
    fn test_converges_on_quadratic() {
        let mut optimizer = PowellOptimizer::new(
            quadratic_parameters(),
            PowellConfig::default(),
            Benchmark::ShiftedQuadratic,
        )
        .unwrap();

        optimizer.optimization_start().unwrap();
        assert!((optimizer.report().smallest_error - 1.21).abs() < 1e-12);

        let mut last = optimizer.report().smallest_error;
        let mut finished = false;
        while !finished {
            finished = optimizer.do_next_optimization_step().unwrap();
            let error = optimizer.report().smallest_error;
            assert!(error <= last);
            last = error;
            assert!(optimizer.report().step < 100);
        }
        optimizer.optimization_end().unwrap();
        optimizer.optimization_end().unwrap();

        let report = optimizer.report();
        assert!((report.best_parameters[0] - 1.1).abs() < 1e-4);
        assert!(report.best_parameters[1].abs() < 1e-4);
        assert!(report.evaluations > 0);
        assert!(matches!(
            optimizer.do_next_optimization_step(),
            Err(OptimizerError::NotStarted)
        ));
    }

    #[test]
    fn test_tolerance_sets_step_count() {
        for (tolerance, steps) in [(10.0, 3), (1.0, 6)] {
            let mut optimizer = PowellOptimizer::new(
                quadratic_parameters(),
                PowellConfig {
                    tolerance,
                    ..Default::default()
                },
                Benchmark::ShiftedQuadratic,
            )
            .unwrap();
            optimizer.optimization_start().unwrap();
            while !optimizer.do_next_optimization_step().unwrap() {}
            assert_eq!(optimizer.report().step, steps);
        }
    }

    #[test]
    fn test_bounds_make_outside_points_infeasible() {
        let parameters = vec![parameter("x", 0.0, 0.5, ParameterInit::Value(0.0))];
        let mut optimizer = PowellOptimizer::new(
            parameters,
            PowellConfig::default(),
            Benchmark::ShiftedQuadratic,
        )
        .unwrap();
        optimizer.optimization_start().unwrap();
        while !optimizer.do_next_optimization_step().unwrap() {}

        let report = optimizer.report();
        assert!(report.best_parameters[0] <= 0.5);
        assert!(report.smallest_error < INFEASIBLE_COST);
    }

    #[test]
    fn test_writes_parameter_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut optimizer = PowellOptimizer::new(
            quadratic_parameters(),
            PowellConfig::default(),
            Benchmark::ShiftedQuadratic,
        )
        .unwrap()
        .with_output_dir(Some(dir.path().to_path_buf()));

        optimizer.optimization_start().unwrap();
        optimizer.do_next_optimization_step().unwrap();

        let content = fs::read_to_string(dir.path().join("parameters.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["step"], 1);
        assert_eq!(value["parameters"][0][0], "x");
    }
}
