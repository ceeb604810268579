//! Max-pooling relaxation.
//!
//! Pool inputs are the previous layer's post-activation outputs, so each
//! input's range is first mapped through that layer's activation (a ReLU
//! clamps it to `[0, ∞)`). If one input provably dominates the rest, the
//! output is exactly that input. Otherwise the output is bounded
//! below by the input with the largest lower bound and above by the
//! largest upper bound in the window.

use super::{ln_enclosure, SCurve};
use crate::network::{Layer, Neuron};
use crate::types::Activation;
use fppoly_core::{AffineExpr, FppolyError, Interval, Result};

/// Post-ReLU true range `(lower, upper)` of a neuron with bounds `(lb, ub)`.
#[inline]
pub fn relu_range(lb: f64, ub: f64) -> (f64, f64) {
    if ub <= 0.0 {
        (0.0, 0.0)
    } else if -lb > 0.0 {
        (-lb, ub)
    } else {
        (0.0, ub)
    }
}

/// True range `(lower, upper)` of a neuron with pre-activation bounds
/// `(lb, ub)` after `activation`.
pub fn post_activation_range(activation: Activation, lb: f64, ub: f64) -> (f64, f64) {
    let pre = Interval::new(lb, ub);
    let image = match activation {
        Activation::None => pre,
        Activation::Relu => return relu_range(lb, ub),
        Activation::Sigmoid => SCurve::Sigmoid.image(pre),
        Activation::Tanh => SCurve::Tanh.image(pre),
        Activation::Parabola => pre.square(),
        Activation::Log => ln_enclosure(pre),
    };
    (image.lower(), image.upper())
}

/// `true` if input `j` is at least every other input in `ranges`.
pub fn dominates(ranges: &[(f64, f64)], j: usize) -> bool {
    let (inf_j, sup_j) = ranges[j];
    ranges.iter().enumerate().all(|(k, &(inf_k, sup_k))| {
        k == j
            || (inf_k == sup_k && inf_j >= sup_k)
            || (inf_j == inf_k && sup_j == sup_k && inf_j == sup_j)
            || inf_j > sup_k
    })
}

/// Build the output neuron for one pooling window over `prev`'s neurons.
pub fn pool_neuron(prev: &Layer, prev_index: usize, window: &[usize]) -> Result<Neuron> {
    if window.is_empty() {
        return Err(FppolyError::InvalidSpec("empty pooling window".to_string()));
    }
    let mut ranges = Vec::with_capacity(window.len());
    for &dim in window {
        let n = prev.neuron(prev_index, dim)?;
        ranges.push(post_activation_range(prev.activation, n.lb, n.ub));
    }

    let mut max_l = (f64::NEG_INFINITY, window[0]);
    let mut max_u = f64::NEG_INFINITY;
    for (&(inf, sup), &dim) in ranges.iter().zip(window) {
        if inf > max_l.0 {
            max_l = (inf, dim);
        }
        max_u = max_u.max(sup);
    }

    let one = Interval::point(1.0);
    let winner = (0..ranges.len()).find(|&j| dominates(&ranges, j));
    let (lower_relax, upper_relax) = match winner {
        Some(j) => {
            let id = AffineExpr::sparse(vec![window[j]], vec![one], Interval::ZERO)?;
            (id.clone(), id)
        }
        None => (
            AffineExpr::sparse(vec![max_l.1], vec![one], Interval::ZERO)?,
            AffineExpr::constant(Interval::point(max_u)),
        ),
    };

    Ok(Neuron {
        lb: -max_l.0,
        ub: max_u,
        forward_expr: None,
        lower_relax: Some(lower_relax),
        upper_relax: Some(upper_relax),
    })
}
