//! ReLU triangle relaxation.
//!
//! For a crossing neuron with true range `[l, u]` (`l < 0 < u`) the upper
//! line is the chord `λ·(x - l)` with `λ = u / (u - l)`. The lower line is
//! `0` or `x`, whichever encloses the smaller area. The scaled line `λ·x`
//! never has the smallest area of the three, so it is not a candidate.

use super::Substitution;
use crate::types::{Relax, Side};
use fppoly_core::rounding::mul_up;
use fppoly_core::{AffineExpr, Interval, RoundingConfig};

/// Chord slope `ub / (ub + lb)` for negated lower bound `lb`.
#[inline]
pub(crate) fn chord_slope(lb: f64, ub: f64) -> Interval {
    let u = Interval::point(ub);
    u / (u + Interval::point(lb))
}

/// Lower-line choice for a crossing neuron.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LowerLine {
    /// `y ≥ 0`
    Zero,
    /// `y ≥ x`
    Identity,
}

pub(crate) fn lower_line(lb: f64, ub: f64) -> LowerLine {
    let width = ub + lb;
    let area1 = lb * ub;
    let area2 = 0.5 * ub * width;
    let area3 = 0.5 * lb * width;
    if area2 < area1 && area2 < area3 {
        LowerLine::Zero
    } else {
        LowerLine::Identity
    }
}

pub fn substitute(cfg: &RoundingConfig, side: Side, coeff: Interval, lb: f64, ub: f64) -> Substitution {
    if coeff.is_zero() || ub <= 0.0 {
        return Substitution::DROP;
    }
    if lb < 0.0 {
        return Substitution::keep(coeff);
    }
    let lambda = chord_slope(lb, ub);
    match Relax::for_coeff(side, coeff) {
        Relax::Upper => {
            let mu = lambda * Interval::point(lb);
            Substitution::linear(cfg, coeff, lambda, mu)
        }
        Relax::Lower => match lower_line(lb, ub) {
            LowerLine::Zero => Substitution::DROP,
            LowerLine::Identity => Substitution::keep(coeff),
        },
        Relax::Boxed => Substitution::boxed(coeff * Interval::new(0.0, ub)),
    }
}

/// Apply the output layer's ReLU to a lower-bound expression of the
/// neuron with pre-activation bounds `bounds`. Returns the rewritten
/// expression and the post-activation negated lower bound.
pub fn apply_relu_lower(cfg: &RoundingConfig, expr: AffineExpr, bounds: Interval) -> (AffineExpr, f64) {
    let (lb, ub) = (bounds.inf, bounds.sup);
    if ub < 0.0 {
        return (AffineExpr::constant(Interval::ZERO), 0.0);
    }
    if lb < 0.0 {
        return (expr, lb);
    }
    let area1 = lb * ub;
    let area2 = 0.5 * ub * (ub + lb);
    if area1 < area2 {
        let lambda = chord_slope(lb, ub);
        (expr.multiply(cfg, lambda), mul_up(lambda.sup, lb))
    } else {
        (AffineExpr::constant(Interval::ZERO), 0.0)
    }
}

/// Upper-bound counterpart of [`apply_relu_lower`]; returns the
/// post-activation upper bound.
pub fn apply_relu_upper(cfg: &RoundingConfig, expr: AffineExpr, bounds: Interval) -> (AffineExpr, f64) {
    let (lb, ub) = (bounds.inf, bounds.sup);
    if ub < 0.0 {
        return (AffineExpr::constant(Interval::ZERO), 0.0);
    }
    if lb < 0.0 {
        return (expr, ub);
    }
    let lambda = chord_slope(lb, ub);
    let mut expr = expr.multiply(cfg, lambda);
    expr.add_cst(cfg, lambda * Interval::point(lb));
    (expr, ub)
}
