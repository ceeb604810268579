//! Back-substitution of affine expressions down to the input region.
//!
//! An expression over the outputs of layer `k - 1` is pushed through that
//! layer's activation (or its stored MaxPool/LSTM relaxations), composed
//! with the layer's forward expressions, and so on down to layer 0, where
//! it is concretized against the input box. The lower and upper chains are
//! computed independently and may pick different relaxations.

use crate::network::{InputPolytope, Layer};
use crate::transformers::{replace_activation, replace_with_relaxations, scale, sum_terms};
use crate::types::{Relax, Side};
use fppoly_core::{AffineExpr, Interval, RoundingConfig};

/// Substitute every coefficient of `expr` (over `layer`'s neurons) by the
/// neuron's forward expression.
///
/// Zero coefficients are skipped. A neuron without a forward expression
/// contributes its box.
pub fn expr_from_previous_layer(cfg: &RoundingConfig, expr: &AffineExpr, layer: &Layer) -> AffineExpr {
    let terms = expr.iter().filter(|(_, c)| !c.is_zero()).map(|(dim, coeff)| {
        let neuron = &layer.neurons[dim];
        match &neuron.forward_expr {
            Some(forward) => scale(cfg, forward, coeff),
            None => AffineExpr::constant(cfg.mul_cst(neuron.bounds(), coeff)),
        }
    });
    sum_terms(cfg, terms, expr.cst())
}

/// Read-only view of finalized layers and the input region.
#[derive(Debug, Clone, Copy)]
pub struct BackSubstitution<'a> {
    cfg: &'a RoundingConfig,
    layers: &'a [Layer],
    input: &'a [Interval],
    polytope: Option<&'a InputPolytope>,
}

impl<'a> BackSubstitution<'a> {
    pub fn new(
        cfg: &'a RoundingConfig,
        layers: &'a [Layer],
        input: &'a [Interval],
        polytope: Option<&'a InputPolytope>,
    ) -> Self {
        Self {
            cfg,
            layers,
            input,
            polytope,
        }
    }

    #[inline]
    pub fn config(&self) -> &'a RoundingConfig {
        self.cfg
    }

    /// Rewrite `expr`, an expression over the outputs of layer `from - 1`
    /// (or the input when `from == 0`), into an expression over the input.
    pub fn substitute(&self, expr: AffineExpr, side: Side, from: usize) -> AffineExpr {
        assert!(from <= self.layers.len(), "back-substitution past finalized layers");
        self.layers[..from].iter().rev().fold(expr, |expr, layer| {
            if layer.kind.is_affine() {
                let pre = replace_activation(self.cfg, expr, side, layer);
                expr_from_previous_layer(self.cfg, &pre, layer)
            } else {
                replace_with_relaxations(self.cfg, expr, side, layer)
            }
        })
    }

    /// Negated lower bound (`Side::Lower`) or upper bound (`Side::Upper`)
    /// of `expr` via back-substitution from layer `from`.
    pub fn bound(&self, expr: AffineExpr, side: Side, from: usize) -> f64 {
        let expr = self.substitute(expr, side, from);
        self.concretize(&expr, side)
    }

    /// Both bounds of `expr`, each through its own chain.
    pub fn bounds(&self, expr: &AffineExpr, from: usize) -> Interval {
        Interval::new(
            self.bound(expr.clone(), Side::Lower, from),
            self.bound(expr.clone(), Side::Upper, from),
        )
    }

    /// Evaluate an expression over the input against the input region.
    pub fn concretize(&self, expr: &AffineExpr, side: Side) -> f64 {
        let sum = match self.polytope {
            Some(poly) => {
                let primitive = self.input_poly_expr(expr, side, poly);
                concretize_box(&primitive, &poly.primitive)
            }
            None => concretize_box(expr, self.input),
        };
        match side {
            Side::Lower => sum.inf,
            Side::Upper => sum.sup,
        }
    }

    /// For polytope inputs, replace each input coefficient by the input's
    /// lower or upper expression over the primitive box. Box inputs are
    /// returned unchanged.
    pub fn input_expr(&self, expr: &AffineExpr, side: Side) -> AffineExpr {
        match self.polytope {
            Some(poly) => self.input_poly_expr(expr, side, poly),
            None => expr.clone(),
        }
    }

    fn input_poly_expr(&self, expr: &AffineExpr, side: Side, poly: &InputPolytope) -> AffineExpr {
        let terms = expr.iter().filter(|(_, c)| !c.is_zero()).map(|(dim, coeff)| {
            match Relax::for_coeff(side, coeff) {
                Relax::Upper => scale(self.cfg, &poly.uexprs[dim], coeff),
                Relax::Lower => scale(self.cfg, &poly.lexprs[dim], coeff),
                Relax::Boxed => AffineExpr::constant(coeff * self.input[dim]),
            }
        });
        sum_terms(self.cfg, terms, expr.cst())
    }
}

/// `cst + Σ cᵢ·box[dᵢ]` with plain interval products.
fn concretize_box(expr: &AffineExpr, region: &[Interval]) -> Interval {
    expr.iter()
        .fold(expr.cst(), |acc, (dim, coeff)| acc + coeff * region[dim])
}
