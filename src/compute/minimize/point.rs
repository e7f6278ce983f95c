//! Function sample points.

use serde::{Deserialize, Serialize};

/// A sample `(x, f(x))` of a scalar function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OneDimFunctionPoint {
    pub x: f64,
    pub y: f64,
}

impl OneDimFunctionPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A sample `(x, f(x))` of a function of several variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiDimFunctionPoint {
    pub x: Vec<f64>,
    pub y: f64,
}

impl MultiDimFunctionPoint {
    pub fn new(x: Vec<f64>, y: f64) -> Self {
        Self { x, y }
    }
}

/// The point `start + t * direction`.
pub fn point_along(start: &[f64], direction: &[f64], t: f64) -> Vec<f64> {
    start
        .iter()
        .zip(direction)
        .map(|(s, d)| s + t * d)
        .collect()
}
