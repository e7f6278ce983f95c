//! Powell's conjugate-direction method, driven one line search at a time.

use log::{debug, info};

use crate::compute::evolution::{CostError, CostFunction};

use super::brent::BrentOneDimMinimizer;
use super::point::{MultiDimFunctionPoint, point_along};

/// Errors raised by the multi-dimensional minimizer.
#[derive(Debug, thiserror::Error)]
pub enum MinimizerError {
    #[error("start point must have at least one dimension")]
    EmptyStartPoint,
    #[error("minimization has not been started")]
    NotStarted,
    #[error("cost function failed: {0}")]
    Cost(#[from] CostError),
}

/// Lifecycle of a minimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimizerState {
    Unstarted,
    Running,
    Converged,
}

/// Minimizes a cost function without derivatives.
///
/// One call of [`do_minimization_step`](Self::do_minimization_step) either
/// line-minimizes along a single direction or, after all `n` directions were
/// searched, runs the end-of-sweep bookkeeping. Convergence is reached when a
/// complete sweep lowers the function value by at most `tolerance`
/// (absolute).
pub struct PowellMultiDimMinimizer<C> {
    line_minimizer: BrentOneDimMinimizer,
    tolerance: f64,
    function: Option<C>,
    directions: Vec<Vec<f64>>,
    point_last_iteration: MultiDimFunctionPoint,
    current: MultiDimFunctionPoint,
    cursor: usize,
    biggest_decrease: f64,
    biggest_decrease_direction: usize,
    last_value: f64,
    state: MinimizerState,
    evaluations: u64,
}

impl<C: CostFunction> PowellMultiDimMinimizer<C> {
    pub fn new(line_minimizer: BrentOneDimMinimizer, tolerance: f64) -> Self {
        Self {
            line_minimizer,
            tolerance,
            function: None,
            directions: Vec::new(),
            point_last_iteration: MultiDimFunctionPoint::default(),
            current: MultiDimFunctionPoint::default(),
            cursor: 0,
            biggest_decrease: 0.0,
            biggest_decrease_direction: 0,
            last_value: 0.0,
            state: MinimizerState::Unstarted,
            evaluations: 0,
        }
    }

    /// Evaluate the start point and reset the search directions to the
    /// coordinate axes.
    pub fn minimization_start(
        &mut self,
        function: C,
        start: Vec<f64>,
    ) -> Result<(), MinimizerError> {
        if start.is_empty() {
            return Err(MinimizerError::EmptyStartPoint);
        }

        let dim = start.len();
        let y = function.cost(&start)?;
        self.evaluations = 1;

        self.directions = (0..dim)
            .map(|i| {
                let mut direction = vec![0.0; dim];
                direction[i] = 1.0;
                direction
            })
            .collect();

        self.point_last_iteration = MultiDimFunctionPoint::new(start, y);
        self.current = self.point_last_iteration.clone();
        self.cursor = 0;
        self.biggest_decrease = 0.0;
        self.biggest_decrease_direction = 0;
        self.last_value = y;
        self.function = Some(function);
        self.state = MinimizerState::Running;

        info!("Started Powell minimization in {} dimensions, f = {:.6}", dim, y);
        Ok(())
    }

    /// Perform one step. Returns `true` once converged.
    pub fn do_minimization_step(&mut self) -> Result<bool, MinimizerError> {
        match self.state {
            MinimizerState::Unstarted => return Err(MinimizerError::NotStarted),
            MinimizerState::Converged => return Ok(true),
            MinimizerState::Running => {}
        }
        let function = self.function.as_ref().ok_or(MinimizerError::NotStarted)?;

        if self.cursor == 0 {
            self.biggest_decrease = 0.0;
            self.biggest_decrease_direction = 0;
            self.last_value = self.point_last_iteration.y;
        }

        let dim = self.directions.len();
        if self.cursor < dim {
            self.current = line_minimize(
                &self.line_minimizer,
                function,
                &self.current.x,
                &self.directions[self.cursor],
                &mut self.evaluations,
            )?;

            let decrease = self.last_value - self.current.y;
            if decrease > self.biggest_decrease {
                self.biggest_decrease = decrease;
                self.biggest_decrease_direction = self.cursor;
            }
            self.last_value = self.current.y;
            self.cursor += 1;
            return Ok(false);
        }

        self.cursor = 0;

        if (self.point_last_iteration.y - self.last_value).abs() <= self.tolerance {
            self.state = MinimizerState::Converged;
            info!(
                "Powell minimization converged after {} evaluations, f = {:.6}",
                self.evaluations, self.current.y
            );
            return Ok(true);
        }

        let last = &self.point_last_iteration;
        let extrapolated_x: Vec<f64> = self
            .current
            .x
            .iter()
            .zip(&last.x)
            .map(|(c, l)| 2.0 * c - l)
            .collect();
        let movement: Vec<f64> = self
            .current
            .x
            .iter()
            .zip(&last.x)
            .map(|(c, l)| c - l)
            .collect();

        let extrapolated_y = function.cost(&extrapolated_x)?;
        self.evaluations += 1;

        if extrapolated_y < last.y {
            let t = 2.0 * (last.y - 2.0 * self.current.y + extrapolated_y)
                * (last.y - self.current.y - self.biggest_decrease).powi(2)
                - self.biggest_decrease * (last.y - extrapolated_y).powi(2);

            if t < 0.0 {
                self.current = line_minimize(
                    &self.line_minimizer,
                    function,
                    &self.current.x,
                    &movement,
                    &mut self.evaluations,
                )?;
                debug!(
                    "Replacing direction {} by the net movement of the sweep",
                    self.biggest_decrease_direction
                );
                self.directions[self.biggest_decrease_direction] = movement;
            }
        }

        self.point_last_iteration = self.current.clone();
        debug!("Powell sweep finished, f = {:.6}", self.current.y);

        Ok(false)
    }

    /// Release the cost function. Calling it again returns `None`.
    pub fn minimization_end(&mut self) -> Option<C> {
        self.function.take()
    }

    /// Best point found so far.
    pub fn minimum_point(&self) -> &MultiDimFunctionPoint {
        &self.current
    }

    pub fn state(&self) -> MinimizerState {
        self.state
    }

    /// Cost evaluations since the last start.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }
}

/// Minimize `function` on the line `start + t * direction`.
fn line_minimize<C: CostFunction>(
    line_minimizer: &BrentOneDimMinimizer,
    function: &C,
    start: &[f64],
    direction: &[f64],
    evaluations: &mut u64,
) -> Result<MultiDimFunctionPoint, CostError> {
    let mut along = |t: f64| {
        *evaluations += 1;
        function.cost(&point_along(start, direction, t))
    };
    let p = line_minimizer.minimize(&mut along, 0.0)?;
    Ok(MultiDimFunctionPoint::new(
        point_along(start, direction, p.x),
        p.y,
    ))
}
