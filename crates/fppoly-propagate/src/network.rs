//! Layered network state held by an analysis.
//!
//! Neuron bounds follow the negated convention: `lb` stores the negation of
//! the true lower bound, so a neuron spans `[-lb, ub]`.

use crate::types::{Activation, LayerKind};
use fppoly_core::{AffineExpr, FppolyError, Interval, Result};
use serde::{Deserialize, Serialize};

/// One neuron of a layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Neuron {
    /// Negated pre-activation lower bound.
    pub lb: f64,
    /// Pre-activation upper bound.
    pub ub: f64,
    /// Affine map from the previous layer's outputs (Affine/Conv layers).
    pub forward_expr: Option<AffineExpr>,
    /// Lower relaxation over the previous layer's outputs (MaxPool/LSTM).
    pub lower_relax: Option<AffineExpr>,
    /// Upper relaxation over the previous layer's outputs (MaxPool/LSTM).
    pub upper_relax: Option<AffineExpr>,
}

impl Neuron {
    pub fn with_expr(expr: AffineExpr) -> Self {
        Self {
            forward_expr: Some(expr),
            ..Self::default()
        }
    }

    /// Bounds as an interval.
    #[inline]
    pub fn bounds(&self) -> Interval {
        Interval::new(self.lb, self.ub)
    }

    #[inline]
    pub fn set_bounds(&mut self, bounds: Interval) {
        self.lb = bounds.inf;
        self.ub = bounds.sup;
    }
}

/// Recurrent state of an LSTM layer between time steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LstmState {
    /// Hidden-state bounds after the last step.
    pub h: Vec<Interval>,
    /// Cell-state bounds after the last step.
    pub c: Vec<Interval>,
    /// Number of steps processed.
    pub steps: usize,
}

impl LstmState {
    pub fn new(hidden: usize) -> Self {
        Self {
            h: vec![Interval::ZERO; hidden],
            c: vec![Interval::ZERO; hidden],
            steps: 0,
        }
    }
}

/// A layer: its kind, the activation applied to its neurons, and the neurons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub kind: LayerKind,
    pub activation: Activation,
    pub neurons: Vec<Neuron>,
    /// Present only on `LstmCell` layers.
    pub lstm: Option<LstmState>,
}

impl Layer {
    pub fn new(kind: LayerKind, activation: Activation, neurons: Vec<Neuron>) -> Self {
        let lstm = (kind == LayerKind::LstmCell).then(|| LstmState::new(neurons.len()));
        Self {
            kind,
            activation,
            neurons,
            lstm,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn neuron(&self, layer: usize, i: usize) -> Result<&Neuron> {
        self.neurons.get(i).ok_or(FppolyError::InvalidNeuron {
            layer,
            neuron: i,
            size: self.neurons.len(),
        })
    }
}

/// Input dimensions described by affine bounds over a primitive box.
///
/// Input `i` satisfies `lexprs[i](p) ≤ xᵢ ≤ uexprs[i](p)` for every `p` in
/// `primitive`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPolytope {
    pub lexprs: Vec<AffineExpr>,
    pub uexprs: Vec<AffineExpr>,
    pub primitive: Vec<Interval>,
}

/// Symbolic bounds of the output layer over the input dimensions, with the
/// output activation applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputRecord {
    pub lexprs: Vec<AffineExpr>,
    pub uexprs: Vec<AffineExpr>,
    /// Post-activation bounds, negated-lower form.
    pub bounds: Vec<Interval>,
}

/// Everything back-substitution reads: the input region and the layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    /// Input box, negated-lower form.
    pub input: Vec<Interval>,
    pub polytope: Option<InputPolytope>,
    pub layers: Vec<Layer>,
    pub output: Option<OutputRecord>,
}

impl Network {
    pub fn new(input: Vec<Interval>, polytope: Option<InputPolytope>) -> Self {
        Self {
            input,
            polytope,
            layers: Vec::new(),
            output: None,
        }
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, layer: usize) -> Result<&Layer> {
        self.layers.get(layer).ok_or(FppolyError::InvalidLayer {
            layer,
            num_layers: self.layers.len(),
        })
    }

    pub fn layer_mut(&mut self, layer: usize) -> Result<&mut Layer> {
        let num_layers = self.layers.len();
        self.layers
            .get_mut(layer)
            .ok_or(FppolyError::InvalidLayer { layer, num_layers })
    }

    /// Number of variables the next layer's expressions range over.
    pub fn next_input_dim(&self) -> usize {
        self.layers
            .last()
            .map_or(self.input.len(), |layer| layer.len())
    }
}
