//! Activation transformers.
//!
//! Each transformer rewrites one coefficient of an expression over a
//! layer's post-activation outputs into a coefficient (and a constant
//! contribution) over the same layer's pre-activation values. Which
//! relaxation surface is used depends on the side being bounded and the
//! sign of the coefficient, see [`Relax`](crate::types::Relax).
//!
//! Transcendental endpoint values are enclosed by evaluating once under a
//! downward [`RoundingGuard`] and once under an upward one.

pub mod log;
pub mod lstm;
pub mod maxpool;
pub mod parabola;
pub mod relu;
pub mod s_curve;

use crate::network::Layer;
use crate::types::{Activation, Relax, Side};
use fppoly_core::rounding::{self, add_up};
use fppoly_core::{AffineExpr, Interval, RoundingConfig, RoundingGuard};

pub use s_curve::SCurve;

/// Replacement for one coefficient: the new coefficient on the
/// pre-activation variable and the amount added to the constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Substitution {
    pub coeff: Interval,
    pub cst: Interval,
}

impl Substitution {
    /// The neuron contributes nothing.
    pub const DROP: Substitution = Substitution {
        coeff: Interval::ZERO,
        cst: Interval::ZERO,
    };

    /// The activation is the identity on this neuron's range.
    #[inline]
    pub fn keep(coeff: Interval) -> Self {
        Self {
            coeff,
            cst: Interval::ZERO,
        }
    }

    /// Flat relaxation: the whole contribution moves into the constant.
    #[inline]
    pub fn boxed(cst: Interval) -> Self {
        Self {
            coeff: Interval::ZERO,
            cst,
        }
    }

    /// Linear relaxation `slope·y + intercept` scaled by `coeff`.
    #[inline]
    pub fn linear(cfg: &RoundingConfig, coeff: Interval, slope: Interval, intercept: Interval) -> Self {
        Self {
            coeff: cfg.mul_coeff(slope, coeff),
            cst: cfg.mul_cst(intercept, coeff),
        }
    }
}

/// Rewrite `expr` (over `layer`'s outputs) through `layer`'s activation.
///
/// The result ranges over `layer`'s pre-activation values, with the same
/// dimensions as `expr`.
pub fn replace_activation(
    cfg: &RoundingConfig,
    mut expr: AffineExpr,
    side: Side,
    layer: &Layer,
) -> AffineExpr {
    let activation = layer.activation;
    if activation == Activation::None {
        return expr;
    }
    let mut cst = expr.cst();
    for i in 0..expr.len() {
        let neuron = &layer.neurons[expr.dim(i)];
        let coeff = expr.coeffs()[i];
        let (lb, ub) = (neuron.lb, neuron.ub);
        let sub = match activation {
            Activation::Relu => relu::substitute(cfg, side, coeff, lb, ub),
            Activation::Sigmoid => s_curve::substitute(cfg, side, coeff, lb, ub, SCurve::Sigmoid),
            Activation::Tanh => s_curve::substitute(cfg, side, coeff, lb, ub, SCurve::Tanh),
            Activation::Parabola => parabola::substitute(cfg, side, coeff, lb, ub),
            Activation::Log => log::substitute(cfg, side, coeff, lb, ub),
            Activation::None => Substitution::keep(coeff),
        };
        expr.coeffs_mut()[i] = sub.coeff;
        if !sub.cst.is_zero() {
            cst = cfg.add_cst(sub.cst, cst);
        }
    }
    expr.set_cst(cst);
    expr
}

/// Substitute each coefficient by the stored relaxation of its neuron
/// (MaxPool and LSTM layers), falling back to the neuron's box when a
/// relaxation is absent.
pub fn replace_with_relaxations(
    cfg: &RoundingConfig,
    expr: AffineExpr,
    side: Side,
    layer: &Layer,
) -> AffineExpr {
    let terms = expr.iter().filter(|(_, c)| !c.is_zero()).map(|(dim, coeff)| {
        let neuron = &layer.neurons[dim];
        let relax = match Relax::for_coeff(side, coeff) {
            Relax::Upper => neuron.upper_relax.as_ref(),
            Relax::Lower => neuron.lower_relax.as_ref(),
            Relax::Boxed => None,
        };
        match relax {
            Some(r) => scale(cfg, r, coeff),
            None => AffineExpr::constant(cfg.mul_cst(neuron.bounds(), coeff)),
        }
    });
    sum_terms(cfg, terms, expr.cst())
}

/// `coeff · expr`, keeping constant expressions constant.
pub(crate) fn scale(cfg: &RoundingConfig, expr: &AffineExpr, coeff: Interval) -> AffineExpr {
    if expr.is_constant() {
        expr.clone().multiply_cst(cfg, coeff)
    } else {
        expr.clone().multiply(cfg, coeff)
    }
}

/// `Σ terms + cst`. The first term seeds the sum.
pub(crate) fn sum_terms(
    cfg: &RoundingConfig,
    terms: impl Iterator<Item = AffineExpr>,
    cst: Interval,
) -> AffineExpr {
    let mut acc: Option<AffineExpr> = None;
    for term in terms {
        match acc.as_mut() {
            Some(sum) => sum.add_expr(cfg, &term),
            None => acc = Some(term),
        }
    }
    let mut sum = acc.unwrap_or_else(|| AffineExpr::constant(Interval::ZERO));
    sum.add_cst(cfg, cst);
    sum
}

/// Sound enclosure of `e^x`.
pub fn exp_enclosure(x: f64) -> Interval {
    let lower = {
        let _down = RoundingGuard::downward();
        rounding::exp(x)
    };
    let upper = {
        let _up = RoundingGuard::upward();
        rounding::exp(x)
    };
    Interval::from_bounds(lower, upper)
}

/// Sound enclosure of `ln` over a whole interval. A non-positive lower end
/// gives an unbounded lower side.
pub fn ln_enclosure(x: Interval) -> Interval {
    let lo = x.lower();
    let inf = if lo > 0.0 {
        let _down = RoundingGuard::downward();
        -rounding::ln(lo)
    } else {
        f64::INFINITY
    };
    let sup = if x.upper() > 0.0 {
        let _up = RoundingGuard::upward();
        rounding::ln(x.upper())
    } else {
        f64::NEG_INFINITY
    };
    Interval::new(inf, sup)
}

/// Sound enclosure of `σ(x) = 1 / (1 + e^-x)`.
pub fn sigmoid_enclosure(x: f64) -> Interval {
    let one = Interval::point(1.0);
    let s = one / (one + exp_enclosure(-x));
    clamp_unit(s, 0.0)
}

/// Sound enclosure of `tanh x`.
pub fn tanh_enclosure(x: f64) -> Interval {
    let lower = {
        let _down = RoundingGuard::downward();
        rounding::tanh(x)
    };
    let upper = {
        let _up = RoundingGuard::upward();
        rounding::tanh(x)
    };
    Interval::from_bounds(lower, upper)
}

/// Clamp an enclosure of a function with range `[floor, 1]`.
fn clamp_unit(v: Interval, floor: f64) -> Interval {
    Interval::new(v.inf.min(-floor), v.sup.min(1.0))
}

/// `1 - t²` from an enclosure `t` of `tanh x`.
pub(crate) fn one_minus_square(t: Interval) -> Interval {
    let sq = t.square();
    Interval::new(add_up(-1.0, sq.sup), add_up(1.0, sq.inf))
}
