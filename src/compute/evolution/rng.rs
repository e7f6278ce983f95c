//! Seedable random source shared by the evolution operators.

use rand::prelude::*;
use rand_distr::StandardNormal;

/// Random number generator wrapper for evolution operators.
///
/// The engine owns one instance and lends it to marriage, recombination,
/// mutation and initialization, so a fixed seed reproduces a whole run.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform random value in `[min, max]`.
    ///
    /// Degenerate or reversed ranges return `min`.
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        if !(min < max) {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Standard normal sample, N(0, 1).
    pub fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::random()
    }
}
