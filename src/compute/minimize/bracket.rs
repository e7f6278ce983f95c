//! Downhill bracketing of a scalar minimum.

use log::warn;

use super::point::OneDimFunctionPoint;

/// Golden-ratio magnification of successive intervals.
const GOLD: f64 = 1.618034;
/// Largest magnification allowed for a parabolic-fit step.
const GLIMIT: f64 = 100.0;
/// Guards the parabolic denominator against division by zero.
const TINY: f64 = 1.0e-20;
/// Expansion limit for functions that keep decreasing.
const MAX_EXPANSIONS: usize = 200;

/// Three points with `b.y <= a.y` and `b.y <= c.y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub a: OneDimFunctionPoint,
    pub b: OneDimFunctionPoint,
    pub c: OneDimFunctionPoint,
}

/// Bracket finder with golden growth and parabolic extrapolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParabolicBracketFinder;

impl ParabolicBracketFinder {
    pub fn new() -> Self {
        Self
    }

    /// Search downhill from the initial points `a` and `b`.
    ///
    /// If the function keeps decreasing past the expansion limit, the last
    /// three points are returned as they are.
    pub fn bracket<F, E>(&self, f: &mut F, a: f64, b: f64) -> Result<Bracket, E>
    where
        F: FnMut(f64) -> Result<f64, E>,
    {
        let mut pa = OneDimFunctionPoint::new(a, f(a)?);
        let mut pb = OneDimFunctionPoint::new(b, f(b)?);

        if pb.y > pa.y {
            std::mem::swap(&mut pa, &mut pb);
        }

        let c = golden_step(pa.x, pb.x);
        let mut pc = OneDimFunctionPoint::new(c, f(c)?);

        let mut expansions = 0;
        while pb.y > pc.y {
            if expansions == MAX_EXPANSIONS {
                warn!(
                    "Bracketing stopped after {} expansions at x = {}",
                    MAX_EXPANSIONS, pc.x
                );
                break;
            }
            expansions += 1;

            let r = (pb.x - pa.x) * (pb.y - pc.y);
            let q = (pb.x - pc.x) * (pb.y - pa.y);
            let denominator = 2.0 * with_sign((q - r).abs().max(TINY), q - r);
            let u = pb.x - ((pb.x - pc.x) * q - (pb.x - pa.x) * r) / denominator;
            let ulim = pb.x + GLIMIT * (pc.x - pb.x);

            let pu = if !u.is_finite() {
                let u = golden_step(pb.x, pc.x);
                OneDimFunctionPoint::new(u, f(u)?)
            } else if (pb.x - u) * (u - pc.x) > 0.0 {
                // Parabolic u lies between b and c.
                let fu = f(u)?;
                if fu < pc.y {
                    return Ok(Bracket {
                        a: pb,
                        b: OneDimFunctionPoint::new(u, fu),
                        c: pc,
                    });
                } else if fu > pb.y {
                    return Ok(Bracket {
                        a: pa,
                        b: pb,
                        c: OneDimFunctionPoint::new(u, fu),
                    });
                }
                let u = golden_step(pb.x, pc.x);
                OneDimFunctionPoint::new(u, f(u)?)
            } else if (pc.x - u) * (u - ulim) > 0.0 {
                // Between c and the allowed limit.
                let fu = f(u)?;
                if fu < pc.y {
                    pb = pc;
                    pc = OneDimFunctionPoint::new(u, fu);
                    let u = golden_step(pb.x, pc.x);
                    OneDimFunctionPoint::new(u, f(u)?)
                } else {
                    OneDimFunctionPoint::new(u, fu)
                }
            } else if (u - ulim) * (ulim - pc.x) >= 0.0 {
                OneDimFunctionPoint::new(ulim, f(ulim)?)
            } else {
                let u = golden_step(pb.x, pc.x);
                OneDimFunctionPoint::new(u, f(u)?)
            };

            pa = pb;
            pb = pc;
            pc = pu;
        }

        Ok(Bracket {
            a: pa,
            b: pb,
            c: pc,
        })
    }
}

fn golden_step(from: f64, to: f64) -> f64 {
    to + GOLD * (to - from)
}

/// `|magnitude|` with the sign of `sign`.
pub(super) fn with_sign(magnitude: f64, sign: f64) -> f64 {
    if sign >= 0.0 {
        magnitude.abs()
    } else {
        -magnitude.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn bracket_of(f: impl Fn(f64) -> f64, a: f64, b: f64) -> Bracket {
        let mut f = |x: f64| Ok::<_, Infallible>(f(x));
        ParabolicBracketFinder::new().bracket(&mut f, a, b).unwrap()
    }

    fn assert_valid(bracket: &Bracket) {
        assert!(bracket.b.y <= bracket.a.y);
        assert!(bracket.b.y <= bracket.c.y);
        let (lo, hi) = if bracket.a.x < bracket.c.x {
            (bracket.a.x, bracket.c.x)
        } else {
            (bracket.c.x, bracket.a.x)
        };
        assert!(lo <= bracket.b.x && bracket.b.x <= hi);
    }

    #[test]
    fn test_brackets_quadratic() {
        let bracket = bracket_of(|x| (x - 1.0).powi(2), 0.0, 1.0);
        assert_valid(&bracket);
    }

    #[test]
    fn test_brackets_far_minimum() {
        let bracket = bracket_of(|x| (x - 40.0).powi(2), 0.0, 1.0);
        assert_valid(&bracket);
        assert!(bracket.a.x.min(bracket.c.x) <= 40.0);
        assert!(bracket.a.x.max(bracket.c.x) >= 40.0);
    }

    #[test]
    fn test_brackets_downhill_to_the_left() {
        let bracket = bracket_of(|x| (x + 3.0).powi(2) + 2.0, 0.0, 1.0);
        assert_valid(&bracket);
        assert!(bracket.a.x.min(bracket.c.x) <= -3.0);
    }

    #[test]
    fn test_unbounded_function_terminates() {
        let bracket = bracket_of(|x| -x, 0.0, 1.0);
        assert!(bracket.c.x > 1.0);
    }

    #[test]
    fn test_cost_error_is_propagated() {
        let mut f = |x: f64| if x > 2.0 { Err("diverged") } else { Ok(-x) };
        let result = ParabolicBracketFinder::new().bracket(&mut f, 0.0, 1.0);
        assert_eq!(result, Err("diverged"));
    }
}
