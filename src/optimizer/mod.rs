//! Stepwise model optimizers and the loop that drives them.
//!
//! A [`ModelOptimizer`] is started once, stepped until it reports that it
//! has finished or the caller decides to stop, and ended once. Between steps
//! it publishes an [`OptimizerReport`] with its current error statistics.

mod es;
mod powell;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{info, warn};

use crate::compute::evolution::{CostFunction, EvolutionError};
use crate::compute::minimize::MinimizerError;
use crate::schema::{
    ConfigError, OptimizerAlgorithm, OptimizerConfig, OptimizerReport, RunConfig, RunOutcome,
    StopReason,
};

pub use es::EsOptimizer;
pub use powell::PowellOptimizer;

/// Errors raised by optimizer drivers.
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Evolution(#[from] EvolutionError),
    #[error(transparent)]
    Minimizer(#[from] MinimizerError),
    #[error("could not write results: {0}")]
    Io(#[from] io::Error),
    #[error("optimization has not been started")]
    NotStarted,
}

/// An optimizer driven one step at a time.
pub trait ModelOptimizer {
    fn name(&self) -> &'static str;

    /// Prepare the run and evaluate the starting point(s).
    fn optimization_start(&mut self) -> Result<(), OptimizerError>;

    /// Perform one step. Returns `true` when the optimizer has finished.
    fn do_next_optimization_step(&mut self) -> Result<bool, OptimizerError>;

    /// Finish the run. Calling it more than once has no further effect.
    fn optimization_end(&mut self) -> Result<(), OptimizerError>;

    /// Statistics after the last step.
    fn report(&self) -> OptimizerReport;
}

/// Build the optimizer selected by `config` for `cost`.
pub fn create_optimizer<C>(
    config: &OptimizerConfig,
    cost: C,
) -> Result<Box<dyn ModelOptimizer>, ConfigError>
where
    C: CostFunction + Clone + Send + Sync + 'static,
{
    config.validate()?;
    let optimizer: Box<dyn ModelOptimizer> = match &config.algorithm {
        OptimizerAlgorithm::EvolutionStrategy(es) => Box::new(
            EsOptimizer::new(config.parameters.clone(), es.clone(), cost)?
                .with_output_dir(config.run.output_dir.clone()),
        ),
        OptimizerAlgorithm::Powell(powell) => Box::new(
            PowellOptimizer::new(config.parameters.clone(), powell.clone(), cost)?
                .with_output_dir(config.run.output_dir.clone()),
        ),
    };
    Ok(optimizer)
}

/// Drives a [`ModelOptimizer`] until it finishes or a limit is reached.
#[derive(Debug)]
pub struct OptimizationRun {
    config: RunConfig,
    cancelled: Arc<AtomicBool>,
}

impl OptimizationRun {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Check if the loop should stop before the next step.
    fn should_stop(&self, report: &OptimizerReport) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if report.step >= self.config.max_steps {
            return Some(StopReason::MaxSteps);
        }

        if let Some(target) = self.config.target_error
            && report.smallest_error <= target
        {
            return Some(StopReason::TargetReached);
        }

        None
    }

    /// Run an optimizer with progress callback.
    ///
    /// Errors end the loop with [`StopReason::Error`]; `optimization_end` is
    /// called whenever `optimization_start` succeeded.
    pub fn run_with_callback<O, F>(&self, optimizer: &mut O, mut callback: F) -> RunOutcome
    where
        O: ModelOptimizer + ?Sized,
        F: FnMut(&OptimizerReport),
    {
        let start_time = Instant::now();

        if let Err(e) = optimizer.optimization_start() {
            warn!("{}: could not start optimization: {}", optimizer.name(), e);
            return RunOutcome {
                report: optimizer.report(),
                stop_reason: StopReason::Error(e.to_string()),
                elapsed_seconds: start_time.elapsed().as_secs_f64(),
            };
        }
        callback(&optimizer.report());

        let stop_reason = loop {
            if let Some(reason) = self.should_stop(&optimizer.report()) {
                break reason;
            }

            match optimizer.do_next_optimization_step() {
                Ok(finished) => {
                    callback(&optimizer.report());
                    if finished {
                        break StopReason::Converged;
                    }
                }
                Err(e) => {
                    warn!("{}: optimization step failed: {}", optimizer.name(), e);
                    break StopReason::Error(e.to_string());
                }
            }
        };

        if let Err(e) = optimizer.optimization_end() {
            warn!("{}: could not end optimization: {}", optimizer.name(), e);
        }

        let report = optimizer.report();
        let elapsed = start_time.elapsed().as_secs_f64();
        info!(
            "{} stopped after {} steps ({:?}): smallest error {:.6}, {} evaluations in {:.2}s",
            optimizer.name(),
            report.step,
            stop_reason,
            report.smallest_error,
            report.evaluations,
            elapsed
        );

        RunOutcome {
            report,
            stop_reason,
            elapsed_seconds: elapsed,
        }
    }

    /// Run an optimizer (blocking).
    pub fn run<O: ModelOptimizer + ?Sized>(&self, optimizer: &mut O) -> RunOutcome {
        self.run_with_callback(optimizer, |_| {})
    }
}
