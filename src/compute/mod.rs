//! Compute module - Numerical optimization algorithms.

pub mod benchmark;
pub mod evolution;
pub mod minimize;
