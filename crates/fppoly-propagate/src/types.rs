//! Layer descriptors and analysis configuration.

use crate::parallel::ParallelConfig;
use fppoly_core::{Interval, RoundingConfig, Sign};
use serde::{Deserialize, Serialize};

/// How a layer's neurons are computed from the previous layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    /// Fully connected: dense forward expressions.
    Affine,
    /// Convolution: sparse forward expressions.
    Conv,
    /// Max over windows of previous-layer neurons.
    MaxPool,
    /// Hidden state of a recurrent LSTM cell.
    LstmCell,
}

impl LayerKind {
    /// Layers whose neurons carry an affine forward expression.
    #[inline]
    pub fn is_affine(self) -> bool {
        matches!(self, LayerKind::Affine | LayerKind::Conv)
    }
}

/// Elementwise activation applied after a layer's affine map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Activation {
    #[default]
    None,
    Relu,
    Sigmoid,
    Tanh,
    /// `x ↦ x²`
    Parabola,
    /// Natural logarithm.
    Log,
}

/// Which bound an expression is being pushed toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The expression is a lower bound (its concretization is minimized).
    Lower,
    /// The expression is an upper bound (its concretization is maximized).
    Upper,
}

/// Relaxation surface a coefficient needs from its neuron.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relax {
    /// An upper line `x ≤ λ·y + μ` keeps the bound sound.
    Upper,
    /// A lower line `x ≥ λ·y + μ` keeps the bound sound.
    Lower,
    /// The coefficient straddles zero; only a constant box is sound.
    Boxed,
}

impl Relax {
    /// A negative coefficient on a lower bound, or a positive one on an
    /// upper bound, needs the neuron's upper relaxation.
    pub(crate) fn for_coeff(side: Side, coeff: Interval) -> Relax {
        match (side, coeff.sign()) {
            (Side::Lower, Sign::Negative) | (Side::Upper, Sign::Positive) => Relax::Upper,
            (Side::Lower, Sign::Positive) | (Side::Upper, Sign::Negative) => Relax::Lower,
            (_, Sign::Mixed | Sign::Zero) => Relax::Boxed,
        }
    }
}

/// Configuration for one analysis, fixed at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Floating-point error compensation constants.
    pub rounding: RoundingConfig,

    /// Thread pool sizing for per-layer neuron updates.
    pub parallel: ParallelConfig,

    /// Box the LSTM gate products instead of relaxing them with bilinear
    /// planes.
    pub lstm_force_boxify: bool,
}
