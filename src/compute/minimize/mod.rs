//! Derivative-free local minimization.
//!
//! - `bracket`: downhill search for three points enclosing a scalar minimum
//! - `brent`: Brent's method inside such a bracket
//! - `powell`: Powell's conjugate directions over Brent line searches
//!
//! The Powell minimizer is stepwise: each call of
//! [`PowellMultiDimMinimizer::do_minimization_step`] performs one line search,
//! so callers can observe progress between steps.

mod bracket;
mod brent;
mod point;
mod powell;

pub use bracket::{Bracket, ParabolicBracketFinder};
pub use brent::BrentOneDimMinimizer;
pub use point::{MultiDimFunctionPoint, OneDimFunctionPoint, point_along};
pub use powell::{MinimizerError, MinimizerState, PowellMultiDimMinimizer};
