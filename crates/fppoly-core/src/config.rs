//! Floating-point error compensation constants and the compensated
//! coefficient operations built on them.

use crate::interval::Interval;
use crate::rounding::{add_up, mul_up};
use serde::{Deserialize, Serialize};

/// Error-compensation constants, fixed when an analysis is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundingConfig {
    /// Relative error added per product, proportional to the magnitude of
    /// the expression-side operand (default 2^-52).
    pub ulp: f64,
    /// Absolute error added when a constant term is combined, covering
    /// subnormal rounding (default: smallest positive subnormal).
    pub min_denormal: f64,
}

impl Default for RoundingConfig {
    fn default() -> Self {
        Self {
            ulp: f64::EPSILON,
            min_denormal: f64::from_bits(1),
        }
    }
}

impl RoundingConfig {
    #[inline]
    fn slack(&self, magnitude: f64) -> Interval {
        let m = mul_up(magnitude, self.ulp);
        Interval::new(m, m)
    }

    /// `factor * coeff`, widened by `factor * [±|coeff|·ulp]`.
    #[inline]
    pub fn mul_coeff(&self, factor: Interval, coeff: Interval) -> Interval {
        factor * coeff + factor * self.slack(coeff.magnitude())
    }

    /// [`mul_coeff`](Self::mul_coeff) for constant terms: additionally
    /// widened by `min_denormal` on both sides.
    #[inline]
    pub fn mul_cst(&self, factor: Interval, cst: Interval) -> Interval {
        let r = self.mul_coeff(factor, cst);
        Interval::new(
            add_up(r.inf, self.min_denormal),
            add_up(r.sup, self.min_denormal),
        )
    }

    /// `a + b`, widened by `a * [±|b|·ulp]`.
    #[inline]
    pub fn add_coeff(&self, a: Interval, b: Interval) -> Interval {
        (a + b) + a * self.slack(b.magnitude())
    }

    /// [`add_coeff`](Self::add_coeff) for constant terms.
    #[inline]
    pub fn add_cst(&self, a: Interval, b: Interval) -> Interval {
        let r = self.add_coeff(a, b);
        Interval::new(
            add_up(r.inf, self.min_denormal),
            add_up(r.sup, self.min_denormal),
        )
    }

    /// Sum of two coefficients that both carry rounding history:
    /// widened by `(|a| + |b|)·ulp`.
    #[inline]
    pub fn merge_coeff(&self, a: Interval, b: Interval) -> Interval {
        let e = mul_up(add_up(a.magnitude(), b.magnitude()), self.ulp);
        Interval::new(
            add_up(add_up(a.inf, b.inf), e),
            add_up(add_up(a.sup, b.sup), e),
        )
    }

    /// [`merge_coeff`](Self::merge_coeff) for constant terms.
    #[inline]
    pub fn merge_cst(&self, a: Interval, b: Interval) -> Interval {
        let r = self.merge_coeff(a, b);
        Interval::new(
            add_up(r.inf, self.min_denormal),
            add_up(r.sup, self.min_denormal),
        )
    }
}
