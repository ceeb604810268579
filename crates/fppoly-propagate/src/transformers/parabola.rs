//! `x²` relaxation.
//!
//! The square is convex: the chord `(u + l)·x - u·l` bounds it from above
//! and the tangent at the midpoint `m`, `2m·x - m²`, from below.

use super::Substitution;
use crate::types::{Relax, Side};
use fppoly_core::{Interval, RoundingConfig};

/// Ranges narrower than this are boxed to the squared range.
pub const BOXIFY_WIDTH: f64 = 1e-4;

pub fn substitute(cfg: &RoundingConfig, side: Side, coeff: Interval, lb: f64, ub: f64) -> Substitution {
    if coeff.is_zero() {
        return Substitution::DROP;
    }
    let range = Interval::new(lb, ub);
    if ub + lb < BOXIFY_WIDTH {
        return Substitution::boxed(coeff * range.square());
    }
    let l = -lb;
    // u + l, the slope of both lines.
    let slope = Interval::point(ub) + Interval::point(l);
    match Relax::for_coeff(side, coeff) {
        Relax::Upper => {
            let lu = Interval::point(l) * Interval::point(ub);
            Substitution::linear(cfg, coeff, slope, -lu)
        }
        Relax::Lower => {
            let mid = slope * Interval::point(0.5);
            Substitution::linear(cfg, coeff, slope, -mid.square())
        }
        Relax::Boxed => Substitution::boxed(coeff * range.square()),
    }
}
