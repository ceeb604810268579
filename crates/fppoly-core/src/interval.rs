//! Sound interval kernel in the negated-lower-bound convention.

use crate::rounding::{add_up, div_up, mul_up};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg};

/// An interval stored as `(inf, sup)` denoting `[-inf, sup]`.
///
/// Keeping the lower endpoint negated lets every endpoint computation round
/// toward +∞: an upward-rounded `inf` is a downward-rounded true lower bound.
/// `+∞` in either field means the side is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Interval {
    /// Negated lower endpoint.
    pub inf: f64,
    /// Upper endpoint.
    pub sup: f64,
}

/// Sign class of an interval, used to pick which relaxation surface a
/// coefficient needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Entirely below zero.
    Negative,
    /// Entirely above zero.
    Positive,
    /// Straddles zero.
    Mixed,
    /// Exactly `[0, 0]`.
    Zero,
}

impl Interval {
    pub const ZERO: Interval = Interval { inf: 0.0, sup: 0.0 };
    pub const UNBOUNDED: Interval = Interval {
        inf: f64::INFINITY,
        sup: f64::INFINITY,
    };

    /// Interval from stored (negated) endpoints.
    #[inline]
    pub const fn new(inf: f64, sup: f64) -> Self {
        Self { inf, sup }
    }

    /// Degenerate interval `[v, v]`.
    #[inline]
    pub fn point(v: f64) -> Self {
        Self { inf: -v, sup: v }
    }

    /// Interval `[lower, upper]` from true endpoints.
    #[inline]
    pub fn from_bounds(lower: f64, upper: f64) -> Self {
        Self {
            inf: -lower,
            sup: upper,
        }
    }

    /// True lower endpoint.
    #[inline]
    pub fn lower(&self) -> f64 {
        -self.inf
    }

    /// True upper endpoint.
    #[inline]
    pub fn upper(&self) -> f64 {
        self.sup
    }

    /// `max(|inf|, |sup|)`, the magnitude used for rounding compensation.
    #[inline]
    pub fn magnitude(&self) -> f64 {
        self.inf.abs().max(self.sup.abs())
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.inf == 0.0 && self.sup == 0.0
    }

    #[inline]
    pub fn contains_zero(&self) -> bool {
        self.inf >= 0.0 && self.sup >= 0.0
    }

    #[inline]
    pub fn contains(&self, v: f64) -> bool {
        -self.inf <= v && v <= self.sup
    }

    pub fn sign(&self) -> Sign {
        if self.sup < 0.0 {
            Sign::Negative
        } else if self.inf < 0.0 {
            Sign::Positive
        } else if self.is_zero() {
            Sign::Zero
        } else {
            Sign::Mixed
        }
    }

    /// Sound enclosure of `{x² : x ∈ self}`.
    pub fn square(self) -> Interval {
        let a = self.inf.abs();
        let b = self.sup.abs();
        let hi = mul_up(a, a).max(mul_up(b, b));
        if self.contains_zero() {
            return Interval::new(0.0, hi);
        }
        let m = a.min(b);
        Interval::new(mul_up(-m, m), hi)
    }
}

impl Neg for Interval {
    type Output = Interval;

    #[inline]
    fn neg(self) -> Interval {
        Interval {
            inf: self.sup,
            sup: self.inf,
        }
    }
}

/// Sound sum.
impl Add for Interval {
    type Output = Interval;

    #[inline]
    fn add(self, other: Interval) -> Interval {
        Interval {
            inf: add_up(self.inf, other.inf),
            sup: add_up(self.sup, other.sup),
        }
    }
}

/// Sound product.
impl Mul for Interval {
    type Output = Interval;

    fn mul(self, other: Interval) -> Interval {
        let (bi, bs, ci, cs) = (self.inf, self.sup, other.inf, other.sup);
        let inf = mul_up(bi, -ci)
            .max(mul_up(bi, cs))
            .max(mul_up(bs, ci))
            .max(mul_up(bs, -cs));
        let sup = mul_up(bi, ci)
            .max(mul_up(-bi, cs))
            .max(mul_up(bs, -ci))
            .max(mul_up(bs, cs));
        Interval { inf, sup }
    }
}

/// Sound quotient. A divisor containing zero yields [`Interval::UNBOUNDED`].
impl Div for Interval {
    type Output = Interval;

    fn div(self, other: Interval) -> Interval {
        if other.contains_zero() {
            return Interval::UNBOUNDED;
        }
        let nums = [-self.inf, self.sup];
        let dens = [-other.inf, other.sup];
        let mut inf = f64::NEG_INFINITY;
        let mut sup = f64::NEG_INFINITY;
        for &p in &nums {
            for &q in &dens {
                inf = inf.max(div_up(-p, q));
                sup = sup.max(div_up(p, q));
            }
        }
        Interval { inf, sup }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", -self.inf, self.sup)
    }
}
