//! Activation transformer tests

use crate::network::{Layer, Neuron};
use crate::transformers::{
    exp_enclosure, ln_enclosure, log, parabola, relu, replace_activation, replace_with_relaxations,
    s_curve, sigmoid_enclosure, tanh_enclosure, SCurve, Substitution,
};
use crate::types::{Activation, LayerKind, Side};
use fppoly_core::{AffineExpr, Interval, RoundingConfig};

fn pt(v: f64) -> Interval {
    Interval::point(v)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Check a substitution for coefficient 1 encloses `f` on `[l, u]` from
/// the given side.
fn encloses(sub: Substitution, side: Side, l: f64, u: f64, f: impl Fn(f64) -> f64) {
    for i in 0..=20 {
        let x = l + (u - l) * f64::from(i) / 20.0;
        let line = sub.coeff * pt(x) + sub.cst;
        match side {
            Side::Lower => assert!(line.lower() <= f(x) + 1e-12, "lower line above f at {x}"),
            Side::Upper => assert!(line.upper() >= f(x) - 1e-12, "upper line below f at {x}"),
        }
    }
}

// ============================================================
// ENCLOSURES
// ============================================================

#[test]
fn test_transcendental_enclosures_contain_libm() {
    for x in [-20.0, -1.5, -0.1, 0.0, 0.3, 2.0, 15.0] {
        assert!(exp_enclosure(x).contains(x.exp()));
        assert!(tanh_enclosure(x).contains(x.tanh()));
        assert!(sigmoid_enclosure(x).contains(sigmoid(x)));
        let s = sigmoid_enclosure(x);
        assert!(s.lower() >= 0.0 && s.upper() <= 1.0);
    }
}

#[test]
fn test_ln_enclosure_domain() {
    let v = ln_enclosure(Interval::from_bounds(0.5, 4.0));
    assert!(v.contains(0.5f64.ln()) && v.contains(4.0f64.ln()));
    let open = ln_enclosure(Interval::from_bounds(0.0, 1.0));
    assert_eq!(open.lower(), f64::NEG_INFINITY);
    assert!(open.contains(0.0));
}

// ============================================================
// RELU
// ============================================================

#[test]
fn test_relu_crossing_neuron() {
    let cfg = RoundingConfig::default();
    // Range [-1, 3].
    let up = relu::substitute(&cfg, Side::Upper, pt(1.0), 1.0, 3.0);
    assert!(up.coeff.contains(0.75));
    assert!(up.cst.contains(0.75));
    let lo = relu::substitute(&cfg, Side::Lower, pt(1.0), 1.0, 3.0);
    assert_eq!(lo, Substitution::keep(pt(1.0)));
    encloses(up, Side::Upper, -1.0, 3.0, |x| x.max(0.0));
    encloses(lo, Side::Lower, -1.0, 3.0, |x| x.max(0.0));
}

#[test]
fn test_relu_negative_coefficient_swaps_lines() {
    let cfg = RoundingConfig::default();
    // A negative coefficient on a lower bound needs the upper chord.
    let sub = relu::substitute(&cfg, Side::Lower, pt(-2.0), 1.0, 3.0);
    assert!(sub.coeff.contains(-1.5));
    assert!(sub.cst.contains(-1.5));
}

#[test]
fn test_relu_stable_neurons() {
    let cfg = RoundingConfig::default();
    assert_eq!(relu::substitute(&cfg, Side::Lower, pt(3.0), -0.5, 2.0), Substitution::keep(pt(3.0)));
    assert_eq!(relu::substitute(&cfg, Side::Upper, pt(3.0), 2.0, -0.5), Substitution::DROP);
}

#[test]
fn test_relu_mixed_coefficient_is_boxed() {
    let cfg = RoundingConfig::default();
    let coeff = Interval::from_bounds(-1.0, 1.0);
    let sub = relu::substitute(&cfg, Side::Upper, coeff, 1.0, 3.0);
    assert!(sub.coeff.is_zero());
    assert!(sub.cst.contains(3.0) && sub.cst.contains(-3.0));
}

// ============================================================
// SIGMOID / TANH
// ============================================================

#[test]
fn test_narrow_sigmoid_is_boxed() {
    let cfg = RoundingConfig::default();
    let sub = s_curve::substitute(&cfg, Side::Upper, pt(1.0), 0.003, 0.003, SCurve::Sigmoid);
    assert!(sub.coeff.is_zero());
    assert!(sub.cst.lower() <= sigmoid(-0.003));
    assert!(sub.cst.upper() >= sigmoid(0.003));
}

#[test]
fn test_s_curve_lines_enclose_curve() {
    let cfg = RoundingConfig::default();
    let cases = [(-3.0, -0.5), (0.2, 2.5), (-1.0, 2.0), (-4.0, 0.5), (-0.05, 0.05)];
    for (kind, f) in [
        (SCurve::Sigmoid, sigmoid as fn(f64) -> f64),
        (SCurve::Tanh, f64::tanh as fn(f64) -> f64),
    ] {
        for (l, u) in cases {
            for side in [Side::Lower, Side::Upper] {
                let sub = s_curve::substitute(&cfg, side, pt(1.0), -l, u, kind);
                encloses(sub, side, l, u, f);
            }
        }
    }
}

#[test]
fn test_output_s_curve_boxify() {
    let cfg = RoundingConfig::default();
    let expr = AffineExpr::dense(vec![pt(1.0)], Interval::ZERO);
    let bounds = Interval::from_bounds(-1.0, 2.0);
    let (lexpr, inf) = s_curve::apply_s_curve_lower(&cfg, expr.clone(), bounds, SCurve::Tanh, true);
    let (uexpr, sup) = s_curve::apply_s_curve_upper(&cfg, expr, bounds, SCurve::Tanh, true);
    assert!(lexpr.is_constant() && uexpr.is_constant());
    assert!(-inf <= (-1.0f64).tanh() && sup >= 2.0f64.tanh());
}

// ============================================================
// PARABOLA / LOG
// ============================================================

#[test]
fn test_parabola_lines_enclose_square() {
    let cfg = RoundingConfig::default();
    for (l, u) in [(-2.0, 1.0), (0.5, 3.0), (-4.0, -1.0)] {
        for side in [Side::Lower, Side::Upper] {
            let sub = parabola::substitute(&cfg, side, pt(1.0), -l, u);
            encloses(sub, side, l, u, |x| x * x);
        }
    }
}

#[test]
fn test_narrow_log_is_boxed() {
    let cfg = RoundingConfig::default();
    let sub = log::substitute(&cfg, Side::Lower, pt(1.0), -2.0, 2.00001);
    assert!(sub.coeff.is_zero());
    assert!(sub.cst.contains(2.0f64.ln()));
}

// ============================================================
// LAYER REPLACEMENT
// ============================================================

fn relu_layer(bounds: &[(f64, f64)]) -> Layer {
    let neurons = bounds
        .iter()
        .map(|&(lb, ub)| Neuron {
            lb,
            ub,
            ..Neuron::default()
        })
        .collect();
    Layer::new(LayerKind::Affine, Activation::Relu, neurons)
}

#[test]
fn test_replace_activation_accumulates_constants() {
    let cfg = RoundingConfig::default();
    // Two crossing neurons [-1, 3] and one inactive neuron.
    let layer = relu_layer(&[(1.0, 3.0), (1.0, 3.0), (2.0, -1.0)]);
    let expr = AffineExpr::dense(vec![pt(1.0), pt(1.0), pt(5.0)], pt(1.0));
    let out = replace_activation(&cfg, expr, Side::Upper, &layer);
    assert!(out.coeffs()[0].contains(0.75));
    assert!(out.coeffs()[2].is_zero());
    assert!(out.cst().contains(2.5));
}

#[test]
fn test_replace_activation_identity_layer_is_noop() {
    let cfg = RoundingConfig::default();
    let layer = Layer::new(LayerKind::Affine, Activation::None, vec![Neuron::default(); 2]);
    let expr = AffineExpr::dense(vec![pt(1.0), pt(-2.0)], pt(0.5));
    assert_eq!(replace_activation(&cfg, expr.clone(), Side::Lower, &layer), expr);
}

#[test]
fn test_replace_with_relaxations_picks_side() {
    let cfg = RoundingConfig::default();
    let lower = AffineExpr::dense(vec![pt(1.0)], Interval::ZERO);
    let upper = AffineExpr::constant(pt(4.0));
    let neuron = Neuron {
        lb: 0.0,
        ub: 4.0,
        forward_expr: None,
        lower_relax: Some(lower),
        upper_relax: Some(upper),
    };
    let layer = Layer::new(LayerKind::MaxPool, Activation::None, vec![neuron]);

    let pos = AffineExpr::dense(vec![pt(2.0)], Interval::ZERO);
    let lo = replace_with_relaxations(&cfg, pos.clone(), Side::Lower, &layer);
    assert!(!lo.is_constant());
    assert!(lo.coeffs()[0].contains(2.0));
    let hi = replace_with_relaxations(&cfg, pos, Side::Upper, &layer);
    assert!(hi.is_constant());
    assert!(hi.cst().contains(8.0));

    // Negative coefficient on a lower bound goes through the upper relaxation.
    let neg = AffineExpr::dense(vec![pt(-1.0)], Interval::ZERO);
    let lo = replace_with_relaxations(&cfg, neg, Side::Lower, &layer);
    assert!(lo.is_constant() && lo.cst().contains(-4.0));
}
