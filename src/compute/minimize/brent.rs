//! Brent's method for scalar minimization.

use log::warn;

use super::bracket::{Bracket, ParabolicBracketFinder, with_sign};
use super::point::OneDimFunctionPoint;

/// Golden-section fraction.
const CGOLD: f64 = 0.381_966_0;
/// Absolute floor of the tolerance for minima at zero.
const ZEPS: f64 = 1.0e-10;

/// Scalar minimizer combining golden-section steps with parabolic
/// interpolation.
#[derive(Debug, Clone)]
pub struct BrentOneDimMinimizer {
    bracket_finder: ParabolicBracketFinder,
    /// Fractional precision of the abscissa.
    tolerance: f64,
    max_iterations: usize,
}

impl Default for BrentOneDimMinimizer {
    fn default() -> Self {
        Self::new(1.0e-5, 100)
    }
}

impl BrentOneDimMinimizer {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            bracket_finder: ParabolicBracketFinder::new(),
            tolerance,
            max_iterations,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Minimize `f`, bracketing from `(start, start + 1)`.
    pub fn minimize<F, E>(&self, f: &mut F, start: f64) -> Result<OneDimFunctionPoint, E>
    where
        F: FnMut(f64) -> Result<f64, E>,
    {
        let bracket = self.bracket_finder.bracket(f, start, start + 1.0)?;
        self.minimize_bracketed(f, &bracket)
    }

    /// Minimize `f` inside an existing bracket.
    pub fn minimize_bracketed<F, E>(
        &self,
        f: &mut F,
        bracket: &Bracket,
    ) -> Result<OneDimFunctionPoint, E>
    where
        F: FnMut(f64) -> Result<f64, E>,
    {
        let (mut a, mut b) = if bracket.a.x < bracket.c.x {
            (bracket.a.x, bracket.c.x)
        } else {
            (bracket.c.x, bracket.a.x)
        };

        // x: best so far, w: second best, v: previous w.
        let mut x = bracket.b;
        let mut w = bracket.b;
        let mut v = bracket.b;

        // Last and second-to-last step lengths.
        let mut d: f64 = 0.0;
        let mut e: f64 = 0.0;

        for _ in 0..self.max_iterations {
            let xm = 0.5 * (a + b);
            let tol1 = self.tolerance * x.x.abs() + ZEPS;
            let tol2 = 2.0 * tol1;

            if (x.x - xm).abs() <= tol2 - 0.5 * (b - a) {
                return Ok(x);
            }

            let mut golden = true;
            if e.abs() > tol1 {
                let r = (x.x - w.x) * (x.y - v.y);
                let mut q = (x.x - v.x) * (x.y - w.y);
                let mut p = (x.x - v.x) * q - (x.x - w.x) * r;
                q = 2.0 * (q - r);
                if q > 0.0 {
                    p = -p;
                }
                q = q.abs();

                let previous_e = e;
                e = d;
                let acceptable = p.abs() < (0.5 * q * previous_e).abs()
                    && p > q * (a - x.x)
                    && p < q * (b - x.x);

                if acceptable {
                    d = p / q;
                    let u = x.x + d;
                    if u - a < tol2 || b - u < tol2 {
                        d = with_sign(tol1, xm - x.x);
                    }
                    golden = false;
                }
            }

            if golden {
                e = if x.x >= xm { a - x.x } else { b - x.x };
                d = CGOLD * e;
            }

            let u = if d.abs() >= tol1 {
                x.x + d
            } else {
                x.x + with_sign(tol1, d)
            };
            let fu = OneDimFunctionPoint::new(u, f(u)?);

            if fu.y <= x.y {
                if u >= x.x {
                    a = x.x;
                } else {
                    b = x.x;
                }
                v = w;
                w = x;
                x = fu;
            } else {
                if u < x.x {
                    a = u;
                } else {
                    b = u;
                }
                if fu.y <= w.y || w.x == x.x {
                    v = w;
                    w = fu;
                } else if fu.y <= v.y || v.x == x.x || v.x == w.x {
                    v = fu;
                }
            }
        }

        warn!(
            "Brent line search reached {} iterations without converging",
            self.max_iterations
        );
        Ok(x)
    }
}
