//! Floating-point sound DeepPoly bound propagation.
//!
//! A network is built layer by layer on an [`FpPoly`] handle. Each neuron
//! keeps its forward expression (or, for MaxPool and LSTM layers, a pair of
//! linear relaxations) and its concrete bounds. Bounds of a new layer come
//! from back-substituting every neuron's expression down to the input:
//! - [`transformers`]: sound linear relaxations of ReLU, sigmoid, tanh,
//!   `x²`, `ln`, max pooling and LSTM gate products
//! - [`backsub`]: the back-substitution chain and input concretization
//! - [`parallel`]: per-layer neuron updates on a scoped rayon pool
//! - [`analyzer`]: the public handle and its bound queries
//!
//! All arithmetic on coefficients and constants is rounded outward, so every
//! reported bound contains the exact real-valued result.

pub mod analyzer;
pub mod backsub;
pub mod network;
pub mod parallel;
pub mod transformers;
pub mod types;

pub use analyzer::FpPoly;
pub use backsub::{expr_from_previous_layer, BackSubstitution};
pub use network::{InputPolytope, Layer, LstmState, Network, Neuron, OutputRecord};
pub use parallel::{ParallelConfig, SymbolicBounds};
pub use transformers::SCurve;
pub use types::{Activation, AnalysisConfig, LayerKind, Side};

// Re-export core types so callers need a single dependency.
pub use fppoly_core::{AffineExpr, Bound, FppolyError, Interval, Result, RoundingConfig};

#[cfg(test)]
mod tests;
