//! Natural-log relaxation.
//!
//! `ln` is concave on `(0, ∞)`: the tangent at the midpoint bounds it from
//! above and the chord from below. A range reaching below zero has no
//! finite bound, so the contribution becomes unbounded. A range starting
//! at exactly zero keeps the tangent but has no finite lower line.

use super::{ln_enclosure, Substitution};
use crate::types::{Relax, Side};
use fppoly_core::{Interval, RoundingConfig};

/// Ranges narrower than this are boxed to `[ln l, ln u]`.
pub const BOXIFY_WIDTH: f64 = 1e-4;

pub fn substitute(cfg: &RoundingConfig, side: Side, coeff: Interval, lb: f64, ub: f64) -> Substitution {
    if coeff.is_zero() {
        return Substitution::DROP;
    }
    let l = -lb;
    let relax = Relax::for_coeff(side, coeff);
    if l < 0.0 || ub <= 0.0 || (l == 0.0 && relax != Relax::Upper) {
        return Substitution::boxed(Interval::UNBOUNDED);
    }
    let image = ln_enclosure(Interval::new(lb, ub));
    if l > 0.0 && ub + lb < BOXIFY_WIDTH {
        return Substitution::boxed(coeff * image);
    }
    match relax {
        Relax::Upper => {
            // Tangent at m = (u + l) / 2: ln x ≤ x/m + ln m - 1.
            let sum = Interval::point(ub) + Interval::point(l);
            let lambda = Interval::point(2.0) / sum;
            let mid = sum * Interval::point(0.5);
            let mu = cfg.add_cst(Interval::point(-1.0), ln_enclosure(mid));
            Substitution::linear(cfg, coeff, lambda, mu)
        }
        Relax::Lower => {
            // Chord: slope ln(u/l) / (u - l), through (l, ln l).
            let ratio = Interval::point(ub) / Interval::point(l);
            let run = Interval::point(ub) + Interval::point(lb);
            let lambda = ln_enclosure(ratio) / run;
            let ln_l = ln_enclosure(Interval::point(l));
            let mu = cfg.add_cst(ln_l, cfg.mul_cst(Interval::point(lb), lambda));
            Substitution::linear(cfg, coeff, lambda, mu)
        }
        Relax::Boxed => Substitution::boxed(coeff * image),
    }
}
