//! Analytic cost functions for testing and benchmarking the optimizers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::evolution::{CostError, CostFunction};

/// `sum(x_i^2)`, minimum 0 at the origin.
pub fn sphere(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum()
}

/// `(x_0 - 1.1)^2 + sum(x_i^2 for i > 0)`, minimum 0 at `(1.1, 0, ...)`.
pub fn shifted_quadratic(x: &[f64]) -> f64 {
    x.iter()
        .enumerate()
        .map(|(i, v)| if i == 0 { (v - 1.1).powi(2) } else { v * v })
        .sum()
}

/// Generalized Rosenbrock function, minimum 0 at `(1, 1, ...)`.
pub fn rosenbrock(x: &[f64]) -> f64 {
    x.windows(2)
        .map(|w| (1.0 - w[0]).powi(2) + 100.0 * (w[1] - w[0] * w[0]).powi(2))
        .sum()
}

/// Selectable benchmark function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Benchmark {
    #[default]
    Sphere,
    ShiftedQuadratic,
    Rosenbrock,
}

impl Benchmark {
    pub fn evaluate(self, x: &[f64]) -> f64 {
        match self {
            Benchmark::Sphere => sphere(x),
            Benchmark::ShiftedQuadratic => shifted_quadratic(x),
            Benchmark::Rosenbrock => rosenbrock(x),
        }
    }

    /// Location of the global minimum in `dim` dimensions.
    pub fn minimum(self, dim: usize) -> Vec<f64> {
        match self {
            Benchmark::Sphere => vec![0.0; dim],
            Benchmark::ShiftedQuadratic => {
                let mut x = vec![0.0; dim];
                if let Some(first) = x.first_mut() {
                    *first = 1.1;
                }
                x
            }
            Benchmark::Rosenbrock => vec![1.0; dim],
        }
    }
}

impl CostFunction for Benchmark {
    fn cost(&self, parameters: &[f64]) -> Result<f64, CostError> {
        Ok(self.evaluate(parameters))
    }
}

impl FromStr for Benchmark {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sphere" => Ok(Benchmark::Sphere),
            "shifted_quadratic" | "quadratic" => Ok(Benchmark::ShiftedQuadratic),
            "rosenbrock" => Ok(Benchmark::Rosenbrock),
            other => Err(format!(
                "unknown benchmark \"{}\", expected sphere, shifted_quadratic or rosenbrock",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_values() {
        for benchmark in [
            Benchmark::Sphere,
            Benchmark::ShiftedQuadratic,
            Benchmark::Rosenbrock,
        ] {
            for dim in 1..5 {
                assert_eq!(benchmark.evaluate(&benchmark.minimum(dim)), 0.0);
            }
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(sphere(&[1.0, 2.0]), 5.0);
        assert!((shifted_quadratic(&[0.0, 0.0]) - 1.21).abs() < 1e-12);
        assert_eq!(rosenbrock(&[0.0, 0.0]), 1.0);
        assert_eq!(rosenbrock(&[3.0]), 0.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!(" Rosenbrock".parse::<Benchmark>(), Ok(Benchmark::Rosenbrock));
        assert_eq!("quadratic".parse::<Benchmark>(), Ok(Benchmark::ShiftedQuadratic));
        assert!("ackley".parse::<Benchmark>().is_err());
    }
}
