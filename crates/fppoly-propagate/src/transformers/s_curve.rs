//! Sigmoid and tanh relaxations.
//!
//! Both curves are convex below zero and concave above it. On a convex
//! stretch the chord is an upper line and a tangent a lower line; on a
//! concave stretch the roles swap. When the range crosses zero the tangent
//! at the endpoint farther from zero is tried. Every candidate line is
//! checked at the opposite endpoint; a line that cuts the curve there is
//! discarded in favour of a flat box over the curve's image.

use super::{one_minus_square, sigmoid_enclosure, tanh_enclosure, Substitution};
use crate::types::{Relax, Side};
use fppoly_core::{AffineExpr, Interval, RoundingConfig};
use serde::{Deserialize, Serialize};

/// Ranges narrower than this are boxed outright.
pub const BOXIFY_WIDTH: f64 = 0.01;

/// The two s-shaped activations sharing this relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SCurve {
    Sigmoid,
    Tanh,
}

impl SCurve {
    /// Sound enclosure of the curve at `x`.
    pub fn value(self, x: f64) -> Interval {
        match self {
            SCurve::Sigmoid => sigmoid_enclosure(x),
            SCurve::Tanh => tanh_enclosure(x),
        }
    }

    /// Sound enclosure of the curve's image over `pre`.
    pub fn image(self, pre: Interval) -> Interval {
        Interval::new(self.value(-pre.inf).inf, self.value(pre.sup).sup)
    }

    /// Sound enclosure of the derivative at `x`.
    pub fn derivative(self, x: f64) -> Interval {
        match self {
            SCurve::Sigmoid => {
                // σ' = e / (1 + e)², symmetric in x.
                let e = super::exp_enclosure(-x.abs());
                let den = Interval::point(1.0) + e;
                e / (den * den)
            }
            SCurve::Tanh => one_minus_square(tanh_enclosure(x)),
        }
    }
}

/// `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub slope: Interval,
    pub intercept: Interval,
}

impl Line {
    /// Line with `slope` through `(anchor, f_anchor)`.
    pub fn through(cfg: &RoundingConfig, slope: Interval, anchor: f64, f_anchor: Interval) -> Self {
        let intercept = cfg.add_cst(f_anchor, cfg.mul_cst(Interval::point(-anchor), slope));
        Self { slope, intercept }
    }

    /// Enclosure of the line's value at `x`.
    pub fn at(&self, cfg: &RoundingConfig, x: f64) -> Interval {
        cfg.add_cst(self.intercept, cfg.mul_cst(Interval::point(x), self.slope))
    }
}

/// Curve values at both ends of a neuron's range.
#[derive(Debug, Clone, Copy)]
struct Ends {
    kind: SCurve,
    /// Negated lower bound, as stored on the neuron.
    lb: f64,
    ub: f64,
    f_l: Interval,
    f_u: Interval,
}

impl Ends {
    fn new(kind: SCurve, lb: f64, ub: f64) -> Self {
        Self {
            kind,
            lb,
            ub,
            f_l: kind.value(-lb),
            f_u: kind.value(ub),
        }
    }

    /// True lower end.
    #[inline]
    fn l(&self) -> f64 {
        -self.lb
    }

    /// Image of the range, `[f(l), f(u)]`.
    #[inline]
    fn image(&self) -> Interval {
        Interval::new(self.f_l.inf, self.f_u.sup)
    }

    /// Ranges on which a line is either useless or numerically unstable.
    fn degenerate(&self) -> bool {
        self.ub + self.lb < BOXIFY_WIDTH || -self.lb == self.ub || self.f_l.inf == -self.f_u.sup
    }

    fn chord(&self) -> Interval {
        let rise = self.f_u + (-self.f_l);
        let run = Interval::point(self.ub) + Interval::point(self.lb);
        rise / run
    }

    /// Tangent slope at the endpoint farther from zero.
    fn crossing_tangent(&self) -> Interval {
        if self.lb <= self.ub {
            self.kind.derivative(self.ub)
        } else {
            self.kind.derivative(self.l())
        }
    }

    /// Upper line anchored at `u`, or `None` if it dips below the curve at `l`.
    fn upper_line(&self, cfg: &RoundingConfig) -> Option<Line> {
        let (slope, lenient) = if self.ub < 0.0 {
            (self.chord(), true)
        } else if self.lb <= 0.0 {
            (self.kind.derivative(self.ub), false)
        } else {
            (self.crossing_tangent(), false)
        };
        let line = Line::through(cfg, slope, self.ub, self.f_u);
        let at_l = line.at(cfg, self.l());
        let cuts = if lenient {
            at_l.sup < self.f_l.sup
        } else {
            at_l.lower() < self.f_l.sup
        };
        (!cuts).then_some(line)
    }

    /// Lower line anchored at `l`, or `None` if it rises above the curve at `u`.
    fn lower_line(&self, cfg: &RoundingConfig) -> Option<Line> {
        let (slope, lenient) = if self.ub < 0.0 {
            (self.kind.derivative(self.l()), false)
        } else if self.lb <= 0.0 {
            (self.chord(), true)
        } else {
            (self.crossing_tangent(), false)
        };
        let line = Line::through(cfg, slope, self.l(), self.f_l);
        let at_u = line.at(cfg, self.ub);
        let cuts = if lenient {
            at_u.lower() > self.f_u.sup
        } else {
            at_u.sup > self.f_u.lower()
        };
        (!cuts).then_some(line)
    }

    fn line(&self, cfg: &RoundingConfig, relax: Relax) -> Option<Line> {
        if self.degenerate() {
            return None;
        }
        match relax {
            Relax::Upper => self.upper_line(cfg),
            Relax::Lower => self.lower_line(cfg),
            Relax::Boxed => None,
        }
    }
}

pub fn substitute(
    cfg: &RoundingConfig,
    side: Side,
    coeff: Interval,
    lb: f64,
    ub: f64,
    kind: SCurve,
) -> Substitution {
    let ends = Ends::new(kind, lb, ub);
    match ends.line(cfg, Relax::for_coeff(side, coeff)) {
        Some(line) => Substitution::linear(cfg, coeff, line.slope, line.intercept),
        None => Substitution::boxed(coeff * ends.image()),
    }
}

/// Relax a lower-bound expression of a neuron with pre-activation bounds
/// `bounds` through the curve. Returns the new expression and the negated
/// lower bound `f(l)`.
pub fn apply_s_curve_lower(
    cfg: &RoundingConfig,
    expr: AffineExpr,
    bounds: Interval,
    kind: SCurve,
    force_boxify: bool,
) -> (AffineExpr, f64) {
    let ends = Ends::new(kind, bounds.inf, bounds.sup);
    let line = if force_boxify {
        None
    } else {
        ends.line(cfg, Relax::Lower)
    };
    let expr = match line {
        Some(line) => relax_expr(cfg, expr, line),
        None => AffineExpr::constant(ends.f_l),
    };
    (expr, ends.f_l.inf)
}

/// Upper-bound counterpart of [`apply_s_curve_lower`]; returns `f(u)`.
pub fn apply_s_curve_upper(
    cfg: &RoundingConfig,
    expr: AffineExpr,
    bounds: Interval,
    kind: SCurve,
    force_boxify: bool,
) -> (AffineExpr, f64) {
    let ends = Ends::new(kind, bounds.inf, bounds.sup);
    let line = if force_boxify {
        None
    } else {
        ends.line(cfg, Relax::Upper)
    };
    let expr = match line {
        Some(line) => relax_expr(cfg, expr, line),
        None => AffineExpr::constant(ends.f_u),
    };
    (expr, ends.f_u.sup)
}

fn relax_expr(cfg: &RoundingConfig, expr: AffineExpr, line: Line) -> AffineExpr {
    let mut expr = expr.multiply(cfg, line.slope);
    expr.add_cst(cfg, line.intercept);
    expr
}
